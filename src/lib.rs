//! # Style Mirror
//!
//! Writes new blog posts that follow the structure and voice of an existing
//! one without copying it.
//!
//! ## Architecture
//!
//! 1. **Extraction** ([`scrapers`]): load the reference post in a headless
//!    browser and pull its text with per-platform selector fallbacks
//! 2. **Analysis** ([`pipeline::analyze`]): ask Gemini to describe the post's
//!    structure, headings, paragraphing and tone
//! 3. **Composition** ([`pipeline::compose`]): ask Gemini for a new post on a
//!    different topic that follows the analysis
//! 4. **Persistence** ([`storage`]): record each finished project in Supabase
//! 5. **Export** ([`outputs`]): save the post as text, Markdown or HTML
//!
//! The binary drives these stages either as one-shot subcommands or from an
//! interactive [`shell`] backed by a [`workbench::Workbench`], where every
//! stage runs on a background [`worker`].

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod scrapers;
pub mod shell;
pub mod storage;
pub mod utils;
pub mod workbench;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
