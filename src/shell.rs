//! Interactive line-oriented session.
//!
//! Reads commands from stdin and prints worker results as they arrive, so a
//! long extraction or generation never blocks typing the next field.

use crate::api::AskAsync;
use crate::error::Error;
use crate::outputs::export::ExportFormat;
use crate::storage::ProjectStore;
use crate::utils::truncate_for_log;
use crate::workbench::{Applied, Workbench};
use crate::worker::{StageKind, StageReport};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  url <address>          set the reference URL and extract it
  extract                extract the current URL again
  load <file>            read the reference post from a .txt or .md file
  paste                  type or paste the reference post; end with a line containing only .
  analyze                analyze the reference post's structure and style
  topic <text>           set the new post's topic
  keywords <a, b, ...>   set target keywords
  requirements <text>    set additional requirements (empty to clear)
  generate               write the new post
  show [reference|analysis|post]
  save <file> [txt|md|html]
  history                list recently saved projects
  status                 show what is filled in and what is running
  reset                  clear everything
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Url(String),
    Extract,
    Load(PathBuf),
    Paste,
    Analyze,
    Topic(String),
    Keywords(String),
    Requirements(String),
    Generate,
    Show(Field),
    Save(PathBuf, Option<ExportFormat>),
    History,
    Status,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Reference,
    Analysis,
    Post,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let needs = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("`{word}` needs {what}"))
            } else {
                Ok(rest.to_string())
            }
        };
        match word.to_ascii_lowercase().as_str() {
            "url" => needs("an address").map(Command::Url),
            "extract" => Ok(Command::Extract),
            "load" => needs("a file path").map(|p| Command::Load(PathBuf::from(p))),
            "paste" => Ok(Command::Paste),
            "analyze" => Ok(Command::Analyze),
            "topic" => needs("a topic").map(Command::Topic),
            "keywords" => Ok(Command::Keywords(rest.to_string())),
            "requirements" => Ok(Command::Requirements(rest.to_string())),
            "generate" => Ok(Command::Generate),
            "show" => match rest {
                "" | "post" => Ok(Command::Show(Field::Post)),
                "reference" => Ok(Command::Show(Field::Reference)),
                "analysis" => Ok(Command::Show(Field::Analysis)),
                other => Err(format!("unknown field `{other}`")),
            },
            "save" => {
                let mut parts = needs("a file path")?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                let format = match parts.len() {
                    1 => None,
                    2 => {
                        let f = parts.pop().unwrap_or_default();
                        Some(match f.as_str() {
                            "txt" => ExportFormat::Text,
                            "md" => ExportFormat::Markdown,
                            "html" => ExportFormat::Html,
                            other => return Err(format!("unknown format `{other}`")),
                        })
                    }
                    _ => return Err("usage: save <file> [txt|md|html]".to_string()),
                };
                Ok(Command::Save(PathBuf::from(&parts[0]), format))
            }
            "history" => Ok(Command::History),
            "status" => Ok(Command::Status),
            "reset" => Ok(Command::Reset),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command `{other}`; type `help`")),
        }
    }
}

type Input = Lines<BufReader<Stdin>>;

/// Run the session until `quit` or end of input.
pub async fn run<L, S>(mut bench: Workbench<L, S>) -> Result<(), Error>
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(&mut bench, command, &mut input).await {
                            println!("error: {e}");
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            Some(report) = bench.next_report() => show_report(&mut bench, report),
        }
    }
    info!("Shell closed");
    Ok(())
}

fn show_report<L, S>(bench: &mut Workbench<L, S>, report: StageReport)
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    println!("{}", report_message(bench, report));
}

/// Apply `report` and describe what happened for the user.
fn report_message<L, S>(bench: &mut Workbench<L, S>, report: StageReport) -> String
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    let kind = report.kind;
    match bench.apply(report) {
        Ok(Applied::Stale) => format!("{kind} result discarded after reset"),
        Ok(Applied::Updated) => match kind {
            StageKind::Extract => format!(
                "extraction finished: {} characters of reference text",
                bench.state.reference.chars().count()
            ),
            StageKind::Analyze => format!("analysis finished:\n{}", bench.state.analysis),
            StageKind::Compose => match &bench.state.project_id {
                Some(id) => format!("post generated:\n{}\nsaved as project {id}", bench.state.generated),
                None => format!("post generated:\n{}", bench.state.generated),
            },
        },
        Err(message) => format!("{kind} failed: {message}"),
    }
}

async fn execute<L, S>(
    bench: &mut Workbench<L, S>,
    command: Command,
    input: &mut Input,
) -> Result<(), Error>
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    debug!(?command, "Executing");
    match command {
        Command::Url(url) => {
            bench.state.url = url;
            bench.start_extract()?;
            println!("extracting {} ...", bench.state.url);
        }
        Command::Extract => {
            bench.start_extract()?;
            println!("extracting {} ...", bench.state.url);
        }
        Command::Load(path) => {
            let chars = bench.load_reference(&path).await?;
            println!("loaded {chars} characters from {}", path.display());
        }
        Command::Paste => {
            let mut text = Vec::new();
            while let Some(line) = input.next_line().await? {
                if line.trim() == "." {
                    break;
                }
                text.push(line);
            }
            bench.state.reference = text.join("\n");
            println!("reference set ({} characters)", bench.state.reference.chars().count());
        }
        Command::Analyze => {
            bench.start_analyze()?;
            println!("analyzing ...");
        }
        Command::Topic(topic) => bench.state.topic = topic,
        Command::Keywords(keywords) => bench.state.keywords = keywords,
        Command::Requirements(requirements) => bench.state.requirements = requirements,
        Command::Generate => {
            bench.start_compose()?;
            println!("generating ...");
        }
        Command::Show(field) => {
            let text = match field {
                Field::Reference => &bench.state.reference,
                Field::Analysis => &bench.state.analysis,
                Field::Post => &bench.state.generated,
            };
            if text.is_empty() {
                println!("(empty)");
            } else {
                println!("{text}");
            }
        }
        Command::Save(path, format) => {
            let format = format
                .or_else(|| ExportFormat::from_path(&path))
                .unwrap_or_default();
            let written = bench.export(format, &path).await?;
            println!("saved {}", written.display());
        }
        Command::History => {
            for record in bench.history().await? {
                println!("{}", record.summary_line());
            }
        }
        Command::Status => print_status(bench),
        Command::Reset => {
            bench.reset();
            println!("cleared");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_status<L, S>(bench: &Workbench<L, S>)
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    let s = &bench.state;
    let filled = |v: &str| if v.trim().is_empty() { "-".to_string() } else { truncate_for_log(v, 60) };
    println!("url:          {}", filled(&s.url));
    println!("reference:    {} chars", s.reference.chars().count());
    println!("analysis:     {} chars", s.analysis.chars().count());
    println!("topic:        {}", filled(&s.topic));
    println!("keywords:     {}", filled(&s.keywords));
    println!("requirements: {}", filled(&s.requirements));
    println!("post:         {} chars", s.generated.chars().count());
    for kind in [StageKind::Extract, StageKind::Analyze, StageKind::Compose] {
        if bench.is_busy(kind) {
            println!("{kind} running");
        }
    }
    if !bench.has_llm() {
        println!("model:        not configured (set GEMINI_API_KEY)");
    }
    if !bench.has_store() {
        println!("storage:      not configured (set SUPABASE_URL and SUPABASE_KEY)");
    }
}
