//! # Style Mirror
//!
//! Scrapes a reference blog post, has Gemini analyze its structure and voice,
//! and drafts a new post on a different topic in the same style.
//!
//! ## Usage
//!
//! ```sh
//! style_mirror run --url https://blog.naver.com/writer/223344 --topic "Winter skincare"
//! style_mirror shell
//! ```
//!
//! Results go to stdout; logs go to stderr (`RUST_LOG` controls the level).

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use style_mirror::api::GeminiClient;
use style_mirror::cli::{Cli, Command, OutputArgs, ReferenceSource, RequestArgs};
use style_mirror::config::AppConfig;
use style_mirror::error::Error as AppError;
use style_mirror::models::{Draft, GenerationRequest};
use style_mirror::outputs::export::{self, ExportFormat};
use style_mirror::pipeline;
use style_mirror::scrapers::{self, Fetcher};
use style_mirror::shell;
use style_mirror::storage::{ProjectStore, SupabaseStore};
use style_mirror::utils::{non_blank, truncate_for_log};
use style_mirror::workbench::Workbench;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
    }

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.command, ?args.fetcher, "Parsed CLI arguments");

    let config = Arc::new(AppConfig::load(args.config.as_deref()).await?);
    let llm = gemini_client(&args, &config)?;
    let store = supabase_store(&args, &config)?;
    let fetcher = args.fetcher;

    match args.command {
        Command::Extract { url } => {
            let post = scrapers::extract_url(&url, fetcher, &config).await?;
            println!("{}", post.text());
        }
        Command::Analyze { source } => {
            let llm = require_llm(llm)?;
            let (reference, _) = load_reference(&source, fetcher, &config).await?;
            let analysis = pipeline::analyze(&llm, &reference).await?;
            println!("{analysis}");
        }
        Command::Generate {
            reference_file,
            analysis_file,
            url,
            request,
            output,
        } => {
            let llm = require_llm(llm)?;
            let request = generation_request(&request);
            pipeline::validate_request(&request)?;
            let draft = Draft {
                reference_text: tokio::fs::read_to_string(&reference_file).await?,
                reference_url: url.as_deref().and_then(non_blank),
                analysis: tokio::fs::read_to_string(&analysis_file).await?,
                request,
            };
            generate(&llm, store.as_ref(), &draft, &output).await?;
        }
        Command::Run {
            source,
            request,
            output,
        } => {
            let llm = require_llm(llm)?;
            let request = generation_request(&request);
            pipeline::validate_request(&request)?;
            let (reference, reference_url) = load_reference(&source, fetcher, &config).await?;
            let mut draft = Draft {
                reference_text: reference,
                reference_url,
                analysis: String::new(),
                request,
            };
            draft.analysis = pipeline::analyze(&llm, &draft.reference_text).await?;
            info!(preview = %truncate_for_log(&draft.analysis, 200), "Analysis ready");
            generate(&llm, store.as_ref(), &draft, &output).await?;
        }
        Command::History { json, limit } => {
            let store = store.ok_or_else(|| {
                AppError::validation("SUPABASE_URL and SUPABASE_KEY are not set; history is unavailable")
            })?;
            let records = store.recent(limit.unwrap_or(config.history_limit)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no saved projects");
            } else {
                for record in &records {
                    println!("{}", record.summary_line());
                }
            }
        }
        Command::Shell => {
            let bench = Workbench::new(llm.map(Arc::new), store.map(Arc::new), config.clone(), fetcher);
            shell::run(bench).await?;
        }
    }

    info!(elapsed_ms = start_time.elapsed().as_millis(), "Done");
    Ok(())
}

fn gemini_client(args: &Cli, config: &AppConfig) -> Result<Option<GeminiClient>, AppError> {
    match args.gemini_api_key.as_deref().and_then(non_blank) {
        Some(key) => {
            let client = GeminiClient::new(key, config)?;
            info!(model = client.model(), "Gemini client ready");
            Ok(Some(client))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; analysis and generation are disabled");
            Ok(None)
        }
    }
}

fn supabase_store(args: &Cli, config: &AppConfig) -> Result<Option<SupabaseStore>, AppError> {
    let url = args.supabase_url.as_deref().and_then(non_blank);
    let key = args.supabase_key.as_deref().and_then(non_blank);
    match (url, key) {
        (Some(url), Some(key)) => {
            let store = SupabaseStore::new(url, key, config)?;
            info!(table = %config.table, "Supabase store ready");
            Ok(Some(store))
        }
        _ => {
            warn!("SUPABASE_URL or SUPABASE_KEY is not set; projects will not be saved");
            Ok(None)
        }
    }
}

fn require_llm(llm: Option<GeminiClient>) -> Result<GeminiClient, AppError> {
    llm.ok_or_else(|| AppError::validation("GEMINI_API_KEY is not set; analysis and generation are unavailable"))
}

fn generation_request(args: &RequestArgs) -> GenerationRequest {
    GenerationRequest::from_fields(&args.topic, &args.keywords, &args.requirements)
}

/// Reference text plus the URL it came from, if any.
#[instrument(level = "info", skip_all)]
async fn load_reference(
    source: &ReferenceSource,
    fetcher: Fetcher,
    config: &AppConfig,
) -> Result<(String, Option<String>), AppError> {
    match (&source.url, &source.file) {
        (Some(url), _) => {
            let post = scrapers::extract_url(url, fetcher, config).await?;
            Ok((post.text(), Some(url.trim().to_string())))
        }
        (None, Some(path)) => {
            let text = tokio::fs::read_to_string(path).await?;
            info!(path = %path.display(), chars = text.chars().count(), "Loaded reference from file");
            Ok((text, None))
        }
        (None, None) => Err(AppError::validation("give a reference --url or --file")),
    }
}

async fn generate(
    llm: &GeminiClient,
    store: Option<&SupabaseStore>,
    draft: &Draft,
    output: &OutputArgs,
) -> Result<(), AppError> {
    let article = pipeline::generate_and_record(llm, store, draft).await?;
    println!("{}", article.content);
    if let Some(id) = &article.record_id {
        info!(%id, "Project saved");
    }
    if let Some(path) = &output.output {
        let written = export::export(&article.content, export_format(output, path), path).await?;
        info!(path = %written.display(), "Post exported");
    }
    Ok(())
}

fn export_format(output: &OutputArgs, path: &Path) -> ExportFormat {
    output
        .format
        .or_else(|| ExportFormat::from_path(path))
        .unwrap_or_default()
}
