//! Background stage workers.
//!
//! Each long-running stage runs on its own spawned task and publishes exactly
//! one [`StageReport`] on a shared channel. At most one worker per
//! [`StageKind`] may be in flight; the foreground owns the receiver and
//! applies reports as they arrive.

use crate::error::Error;
use crate::models::{ExtractedPost, GeneratedArticle};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Extract,
    Analyze,
    Compose,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Extract => "extraction",
            StageKind::Analyze => "analysis",
            StageKind::Compose => "composition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum StagePayload {
    Reference(ExtractedPost),
    Analysis(String),
    Article(GeneratedArticle),
}

/// The single message a worker sends when it finishes.
#[derive(Debug)]
pub struct StageReport {
    pub kind: StageKind,
    /// Value of [`Workers::epoch`] when the worker was started.
    pub epoch: u64,
    pub outcome: Result<StagePayload, String>,
}

pub struct Workers {
    tx: UnboundedSender<StageReport>,
    rx: UnboundedReceiver<StageReport>,
    running: HashSet<StageKind>,
    epoch: u64,
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}

impl Workers {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            running: HashSet::new(),
            epoch: 0,
        }
    }

    pub fn is_running(&self, kind: StageKind) -> bool {
        self.running.contains(&kind)
    }

    pub fn any_running(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Mark every in-flight worker's eventual report as stale.
    pub fn bump_epoch(&mut self) {
        self.epoch += 1;
    }

    /// Run `job` in the background; its result comes back through
    /// [`Workers::next`]. Fails with [`Error::Busy`] if a worker of the same
    /// kind has not reported yet.
    pub fn spawn<F>(&mut self, kind: StageKind, job: F) -> Result<(), Error>
    where
        F: Future<Output = Result<StagePayload, Error>> + Send + 'static,
    {
        if !self.running.insert(kind) {
            return Err(Error::Busy(kind));
        }
        let tx = self.tx.clone();
        let epoch = self.epoch;
        info!(%kind, "Worker started");
        tokio::spawn(async move {
            let outcome = match tokio::spawn(job).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => {
                    error!(%kind, error = %e, "Worker aborted");
                    Err(format!("{kind} stopped unexpectedly"))
                }
            };
            if tx.send(StageReport { kind, epoch, outcome }).is_err() {
                debug!(%kind, "Receiver gone; dropping report");
            }
        });
        Ok(())
    }

    /// Wait for the next finished worker. Pending forever when none is running.
    pub async fn next(&mut self) -> Option<StageReport> {
        let report = self.rx.recv().await?;
        self.running.remove(&report.kind);
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_report_arrives_and_frees_slot() {
        let mut workers = Workers::new();
        workers
            .spawn(StageKind::Analyze, async { Ok(StagePayload::Analysis("done".into())) })
            .unwrap();
        assert!(workers.is_running(StageKind::Analyze));

        let report = workers.next().await.unwrap();
        assert_eq!(report.kind, StageKind::Analyze);
        assert!(matches!(report.outcome, Ok(StagePayload::Analysis(ref s)) if s == "done"));
        assert!(!workers.any_running());
    }

    #[tokio::test]
    async fn test_second_worker_of_same_kind_is_busy() {
        let mut workers = Workers::new();
        let gate = Arc::new(Notify::new());
        let held = gate.clone();
        workers
            .spawn(StageKind::Compose, async move {
                held.notified().await;
                Err(Error::validation("stopped"))
            })
            .unwrap();

        let err = workers
            .spawn(StageKind::Compose, async { Ok(StagePayload::Analysis(String::new())) })
            .unwrap_err();
        assert!(matches!(err, Error::Busy(StageKind::Compose)));

        // other kinds are unaffected
        workers
            .spawn(StageKind::Extract, async { Err(Error::validation("x")) })
            .unwrap();

        gate.notify_one();
        let mut kinds = vec![workers.next().await.unwrap().kind, workers.next().await.unwrap().kind];
        kinds.sort_by_key(|k| k.to_string());
        assert_eq!(kinds, vec![StageKind::Compose, StageKind::Extract]);
        assert!(workers.spawn(StageKind::Compose, async { Err(Error::validation("y")) }).is_ok());
    }

    #[tokio::test]
    async fn test_failure_carries_message() {
        let mut workers = Workers::new();
        workers
            .spawn(StageKind::Extract, async { Err(Error::validation("enter a blog post URL")) })
            .unwrap();
        let report = workers.next().await.unwrap();
        assert_eq!(report.outcome.unwrap_err(), "enter a blog post URL");
    }

    #[tokio::test]
    async fn test_panicking_worker_still_reports() {
        let mut workers = Workers::new();
        workers
            .spawn(StageKind::Analyze, async {
                if true {
                    panic!("boom");
                }
                Ok(StagePayload::Analysis(String::new()))
            })
            .unwrap();
        let report = workers.next().await.unwrap();
        assert_eq!(report.outcome.unwrap_err(), "analysis stopped unexpectedly");
        assert!(!workers.is_running(StageKind::Analyze));
    }

    #[tokio::test]
    async fn test_epoch_is_stamped() {
        let mut workers = Workers::new();
        workers.bump_epoch();
        workers
            .spawn(StageKind::Analyze, async { Ok(StagePayload::Analysis("a".into())) })
            .unwrap();
        workers.bump_epoch();
        let report = workers.next().await.unwrap();
        assert_eq!(report.epoch, 1);
        assert_eq!(workers.epoch(), 2);
    }
}
