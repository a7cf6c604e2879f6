//! Command-line interface definitions for Style Mirror.
//!
//! Secrets can be given as flags but are normally read from the environment
//! (or a `.env` file loaded at startup).

use crate::outputs::export::ExportFormat;
use crate::scrapers::Fetcher;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for Style Mirror.
///
/// # Examples
///
/// ```sh
/// # Print the text of a reference post
/// style_mirror extract https://blog.naver.com/writer/223344
///
/// # Analyze a post and write a new one in the same style
/// style_mirror run --url https://someone.tistory.com/42 \
///     --topic "Winter skincare" --keywords "moisture, cream" --output post.html --format html
///
/// # Interactive session
/// style_mirror shell
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// How reference pages are loaded
    #[arg(long, value_enum, default_value_t = Fetcher::Browser, global = true)]
    pub fetcher: Fetcher,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape a blog post and print its text
    Extract {
        url: String,
    },
    /// Describe the structure and style of a reference post
    Analyze {
        #[command(flatten)]
        source: ReferenceSource,
    },
    /// Write a new post from a saved reference and analysis
    Generate {
        /// File holding the reference post
        #[arg(long)]
        reference_file: PathBuf,

        /// File holding the analysis
        #[arg(long)]
        analysis_file: PathBuf,

        /// Where the reference came from, recorded with the project
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Extract, analyze and generate in one go
    Run {
        #[command(flatten)]
        source: ReferenceSource,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List recently saved projects
    History {
        /// Print raw records as JSON
        #[arg(long)]
        json: bool,

        /// Number of records to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Interactive session
    Shell,
}

/// Exactly one place to read the reference post from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ReferenceSource {
    /// Blog post to scrape
    #[arg(long)]
    pub url: Option<String>,

    /// UTF-8 text or Markdown file holding the post
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Topic of the new post
    #[arg(short, long)]
    pub topic: String,

    /// Comma-separated target keywords
    #[arg(short, long, default_value = "")]
    pub keywords: String,

    /// Additional requirements
    #[arg(short, long, default_value = "")]
    pub requirements: String,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Also write the post to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format; guessed from the output extension when omitted
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "style_mirror",
            "run",
            "--url",
            "https://someone.tistory.com/42",
            "--topic",
            "Winter skincare",
            "-k",
            "moisture, cream",
            "-o",
            "post",
            "-f",
            "html",
        ]);

        assert_eq!(cli.fetcher, Fetcher::Browser);
        match cli.command {
            Command::Run { source, request, output } => {
                assert_eq!(source.url.as_deref(), Some("https://someone.tistory.com/42"));
                assert!(source.file.is_none());
                assert_eq!(request.topic, "Winter skincare");
                assert_eq!(request.keywords, "moisture, cream");
                assert_eq!(request.requirements, "");
                assert_eq!(output.output, Some(PathBuf::from("post")));
                assert_eq!(output.format, Some(ExportFormat::Html));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "style_mirror",
            "extract",
            "https://example.com/post",
            "--fetcher",
            "http",
            "-c",
            "config.yaml",
        ]);

        assert_eq!(cli.fetcher, Fetcher::Http);
        assert_eq!(cli.config, Some(PathBuf::from("config.yaml")));
        assert!(matches!(cli.command, Command::Extract { ref url } if url == "https://example.com/post"));
    }

    #[test]
    fn test_reference_source_is_exclusive() {
        let both = Cli::try_parse_from([
            "style_mirror",
            "analyze",
            "--url",
            "https://example.com",
            "--file",
            "post.txt",
        ]);
        assert!(both.is_err());

        let neither = Cli::try_parse_from(["style_mirror", "analyze"]);
        assert!(neither.is_err());
    }

    #[test]
    fn test_history_flags() {
        let cli = Cli::parse_from(["style_mirror", "history", "--json", "-l", "5"]);
        assert!(matches!(cli.command, Command::History { json: true, limit: Some(5) }));
    }
}
