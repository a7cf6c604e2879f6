//! Writing generated posts to disk.
//!
//! # Submodules
//!
//! - [`export`]: renders a post as plain text, Markdown or a minimal HTML
//!   document and writes it to a user-chosen path
//!
//! ```text
//! winter_skincare.txt    # content as generated
//! winter_skincare.md     # content as generated
//! winter_skincare.html   # <br>-separated lines in a UTF-8 page
//! ```

pub mod export;
