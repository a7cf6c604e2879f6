//! Foreground state for an interactive session.
//!
//! [`Workbench`] holds the URL, reference text, analysis, request fields and
//! the generated post. Stage starts validate against that state and then hand
//! an owned snapshot to a worker, so the foreground never waits on the
//! network. Results come back through [`Workbench::next_report`] and are
//! folded in by [`Workbench::apply`].

use crate::api::AskAsync;
use crate::config::AppConfig;
use crate::error::Error;
use crate::models::{Draft, GenerationRequest, ProjectRecord};
use crate::outputs::export::{self, ExportFormat};
use crate::pipeline;
use crate::scrapers::{self, Fetcher};
use crate::storage::ProjectStore;
use crate::utils::non_blank;
use crate::worker::{StageKind, StagePayload, StageReport, Workers};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything the user has entered or produced so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub url: String,
    pub reference: String,
    pub analysis: String,
    pub topic: String,
    pub keywords: String,
    pub requirements: String,
    pub generated: String,
    pub project_id: Option<String>,
}

impl SessionState {
    pub fn draft(&self) -> Draft {
        Draft {
            reference_text: self.reference.clone(),
            reference_url: non_blank(&self.url),
            analysis: self.analysis.clone(),
            request: GenerationRequest::from_fields(&self.topic, &self.keywords, &self.requirements),
        }
    }
}

/// What [`Workbench::apply`] did with a successful report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The result was stored in the session.
    Updated,
    /// The report predates the last reset and was dropped.
    Stale,
}

pub struct Workbench<L, S> {
    llm: Option<Arc<L>>,
    store: Option<Arc<S>>,
    config: Arc<AppConfig>,
    fetcher: Fetcher,
    workers: Workers,
    pub state: SessionState,
}

impl<L, S> Workbench<L, S>
where
    L: AskAsync + Send + Sync + 'static,
    S: ProjectStore + Send + Sync + 'static,
{
    pub fn new(
        llm: Option<Arc<L>>,
        store: Option<Arc<S>>,
        config: Arc<AppConfig>,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            llm,
            store,
            config,
            fetcher,
            workers: Workers::new(),
            state: SessionState::default(),
        }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn is_busy(&self, kind: StageKind) -> bool {
        self.workers.is_running(kind)
    }

    fn llm(&self) -> Result<Arc<L>, Error> {
        self.llm
            .clone()
            .ok_or_else(|| Error::validation("GEMINI_API_KEY is not set; analysis and generation are unavailable"))
    }

    /// Start scraping `state.url` in the background.
    #[instrument(level = "info", skip(self), fields(url = %self.state.url))]
    pub fn start_extract(&mut self) -> Result<(), Error> {
        let url = scrapers::validate_url(&self.state.url)?;
        self.state.url = url.clone();
        let config = self.config.clone();
        let fetcher = self.fetcher;
        self.workers.spawn(StageKind::Extract, async move {
            let post = scrapers::extract_url(&url, fetcher, &config).await?;
            Ok(StagePayload::Reference(post))
        })
    }

    /// Replace the reference text with the contents of a UTF-8 file.
    #[instrument(level = "info", skip(self), fields(path = %path.display()))]
    pub async fn load_reference(&mut self, path: &Path) -> Result<usize, Error> {
        let text = tokio::fs::read_to_string(path).await?;
        if text.trim().is_empty() {
            return Err(Error::validation(format!("{} is empty", path.display())));
        }
        let chars = text.chars().count();
        self.state.reference = text;
        info!(chars, "Loaded reference from file");
        Ok(chars)
    }

    /// Start analyzing the current reference text in the background.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the worker is running. A validation error when there is
    /// no reference text or no model key, [`Error::Busy`] when an analysis is
    /// already in flight.
    pub fn start_analyze(&mut self) -> Result<(), Error> {
        if self.state.reference.trim().is_empty() {
            return Err(Error::validation("enter or load a reference post first"));
        }
        let llm = self.llm()?;
        let reference = self.state.reference.clone();
        self.workers.spawn(StageKind::Analyze, async move {
            let analysis = pipeline::analyze(llm.as_ref(), &reference).await?;
            Ok(StagePayload::Analysis(analysis))
        })
    }

    /// Start writing a new post from the session's draft in the background.
    ///
    /// Reference, analysis and topic are checked here, before any worker
    /// exists. The worker records the project when a store is configured.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the worker is running, a validation error for missing
    /// input or model key, or [`Error::Busy`].
    pub fn start_compose(&mut self) -> Result<(), Error> {
        let draft = self.state.draft();
        pipeline::validate_draft(&draft)?;
        let llm = self.llm()?;
        let store = self.store.clone();
        self.workers.spawn(StageKind::Compose, async move {
            let article = pipeline::generate_and_record(llm.as_ref(), store.as_deref(), &draft).await?;
            Ok(StagePayload::Article(article))
        })
    }

    /// Wait for the next worker to finish.
    pub async fn next_report(&mut self) -> Option<StageReport> {
        self.workers.next().await
    }

    /// Fold a worker's result into the state. A failure clears the field that
    /// stage would have filled and leaves everything else alone.
    ///
    /// # Returns
    ///
    /// [`Applied::Stale`] for a report started before the last [`reset`](Self::reset),
    /// whatever its outcome; otherwise [`Applied::Updated`], or the worker's
    /// error message.
    pub fn apply(&mut self, report: StageReport) -> Result<Applied, String> {
        if report.epoch != self.workers.epoch() {
            debug!(kind = %report.kind, "Ignoring result from before reset");
            return Ok(Applied::Stale);
        }
        match report.outcome {
            Ok(StagePayload::Reference(post)) => {
                self.state.reference = post.text();
                Ok(Applied::Updated)
            }
            Ok(StagePayload::Analysis(analysis)) => {
                self.state.analysis = analysis;
                Ok(Applied::Updated)
            }
            Ok(StagePayload::Article(article)) => {
                self.state.generated = article.content;
                self.state.project_id = article.record_id;
                Ok(Applied::Updated)
            }
            Err(message) => {
                warn!(kind = %report.kind, %message, "Stage failed");
                match report.kind {
                    StageKind::Extract => self.state.reference.clear(),
                    StageKind::Analyze => self.state.analysis.clear(),
                    StageKind::Compose => {
                        self.state.generated.clear();
                        self.state.project_id = None;
                    }
                }
                Err(message)
            }
        }
    }

    pub async fn export(&self, format: ExportFormat, path: &Path) -> Result<PathBuf, Error> {
        export::export(&self.state.generated, format, path).await
    }

    pub async fn history(&self) -> Result<Vec<ProjectRecord>, Error> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::validation("SUPABASE_URL and SUPABASE_KEY are not set; history is unavailable"))?;
        Ok(store.recent(self.config.history_limit).await?)
    }

    /// Clear all state. Results from workers still in flight are discarded.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.workers.bump_epoch();
        info!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, ScriptedModel};
    use tokio::sync::Notify;

    fn bench(model: ScriptedModel, store: Option<MemoryStore>) -> Workbench<ScriptedModel, MemoryStore> {
        Workbench::new(
            Some(Arc::new(model)),
            store.map(Arc::new),
            Arc::new(AppConfig::default()),
            Fetcher::Http,
        )
    }

    async fn settle(bench: &mut Workbench<ScriptedModel, MemoryStore>) -> Result<Applied, String> {
        let report = bench.next_report().await.unwrap();
        bench.apply(report)
    }

    #[tokio::test]
    async fn test_analyze_populates_analysis() {
        let mut bench = bench(ScriptedModel::replying("structure notes"), None);
        bench.state.reference = "reference".to_string();
        bench.start_analyze().unwrap();
        assert_eq!(settle(&mut bench).await, Ok(Applied::Updated));
        assert_eq!(bench.state.analysis, "structure notes");
    }

    #[tokio::test]
    async fn test_analyze_requires_reference_and_key() {
        let mut bench = bench(ScriptedModel::replying("x"), None);
        assert!(matches!(bench.start_analyze(), Err(Error::Validation(_))));

        let mut keyless: Workbench<ScriptedModel, MemoryStore> =
            Workbench::new(None, None, Arc::new(AppConfig::default()), Fetcher::Http);
        keyless.state.reference = "reference".to_string();
        let err = keyless.start_analyze().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(!keyless.is_busy(StageKind::Analyze));
    }

    #[tokio::test]
    async fn test_failed_analysis_clears_only_analysis() {
        let mut bench = bench(ScriptedModel::failing("quota exceeded"), None);
        bench.state.reference = "reference".to_string();
        bench.state.analysis = "old analysis".to_string();
        bench.state.topic = "topic".to_string();
        bench.start_analyze().unwrap();

        let message = settle(&mut bench).await.unwrap_err();
        assert!(message.contains("quota exceeded"));
        assert!(bench.state.analysis.is_empty());
        assert_eq!(bench.state.reference, "reference");
        assert_eq!(bench.state.topic, "topic");
    }

    #[tokio::test]
    async fn test_second_start_while_running_is_busy() {
        let gate = Arc::new(Notify::new());
        let mut bench = bench(ScriptedModel::replying("done").gated(gate.clone()), None);
        bench.state.reference = "reference".to_string();
        bench.start_analyze().unwrap();
        assert!(matches!(bench.start_analyze(), Err(Error::Busy(StageKind::Analyze))));

        gate.notify_one();
        settle(&mut bench).await.unwrap();
        assert!(!bench.is_busy(StageKind::Analyze));
    }

    #[tokio::test]
    async fn test_compose_validates_before_spawning() {
        let mut bench = bench(ScriptedModel::replying("post"), Some(MemoryStore::default()));
        bench.state.reference = "reference".to_string();
        bench.state.topic = "topic".to_string();
        assert!(matches!(bench.start_compose(), Err(Error::Validation(_))));
        assert!(!bench.is_busy(StageKind::Compose));
    }

    #[tokio::test]
    async fn test_compose_saves_and_records_id() {
        let mut bench = bench(ScriptedModel::replying("new post"), Some(MemoryStore::default()));
        bench.state.url = "https://example.com/post".to_string();
        bench.state.reference = "reference".to_string();
        bench.state.analysis = "analysis".to_string();
        bench.state.topic = "topic".to_string();
        bench.state.keywords = "a, b".to_string();
        bench.start_compose().unwrap();
        settle(&mut bench).await.unwrap();

        assert_eq!(bench.state.generated, "new post");
        assert_eq!(bench.state.project_id.as_deref(), Some("1"));
        let history = bench.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reference_url.as_deref(), Some("https://example.com/post"));
    }

    #[tokio::test]
    async fn test_extract_rejects_bad_url_up_front() {
        let mut bench = bench(ScriptedModel::replying("x"), None);
        bench.state.url = "not a url".to_string();
        assert!(matches!(bench.start_extract(), Err(Error::Validation(_))));
        assert!(!bench.is_busy(StageKind::Extract));
        assert_eq!(bench.state.url, "not a url");
    }

    #[tokio::test]
    async fn test_load_reference_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("reference.txt");
        std::fs::write(&source, "첫 문단\n\n둘째 문단").unwrap();

        let mut bench = bench(ScriptedModel::replying("x"), None);
        assert_eq!(bench.load_reference(&source).await.unwrap(), 11);
        assert_eq!(bench.state.reference, "첫 문단\n\n둘째 문단");

        assert!(matches!(
            bench.export(ExportFormat::Text, &dir.path().join("out")).await,
            Err(Error::Validation(_))
        ));
        bench.state.generated = "post".to_string();
        let written = bench.export(ExportFormat::Markdown, &dir.path().join("out")).await.unwrap();
        assert_eq!(std::fs::read_to_string(written).unwrap(), "post");
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let mut bench = bench(ScriptedModel::replying("late").gated(gate.clone()), None);
        bench.state.reference = "reference".to_string();
        bench.start_analyze().unwrap();
        bench.reset();
        assert_eq!(bench.state, SessionState::default());

        gate.notify_one();
        assert_eq!(settle(&mut bench).await, Ok(Applied::Stale));
        assert!(bench.state.analysis.is_empty());
    }

    #[tokio::test]
    async fn test_stale_failure_leaves_state_alone() {
        let gate = Arc::new(Notify::new());
        let mut bench = bench(ScriptedModel::failing("boom").gated(gate.clone()), None);
        bench.state.reference = "reference".to_string();
        bench.start_analyze().unwrap();
        bench.reset();
        bench.state.analysis = "typed after reset".to_string();

        gate.notify_one();
        assert_eq!(settle(&mut bench).await, Ok(Applied::Stale));
        assert_eq!(bench.state.analysis, "typed after reset");
    }

    #[tokio::test]
    async fn test_history_requires_store() {
        let bench = bench(ScriptedModel::replying("x"), None);
        assert!(matches!(bench.history().await, Err(Error::Validation(_))));
    }
}
