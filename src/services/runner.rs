use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::domain::{FailureRecord, Notice, NoticeContent};
use crate::errors::{FeederError, FeederResult};
use crate::services::Source;
use crate::storage::FailureLogRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Diffing,
    Aggregating,
    Dispatching,
    Committing,
    Done,
}

/// A source whose feed could not be read this run
#[derive(Debug)]
pub struct FetchFailure {
    pub source: String,
    pub error: FeederError,
}

/// What `dispatch_all` delivered and what it could not.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Per source name, oldest first
    delivered: HashMap<String, Vec<NoticeContent>>,
    failures: Vec<FailureRecord>,
    delivered_notices: usize,
}

impl DispatchOutcome {
    /// Treat every notice as delivered without sending anything.
    pub fn assume_delivered(notices: &[Notice<'_>]) -> Self {
        let mut outcome = Self::default();
        for notice in notices.iter().rev() {
            outcome.record_delivery(notice);
        }
        outcome
    }

    fn record_delivery(&mut self, notice: &Notice<'_>) {
        for name in notice.source_names() {
            self.delivered
                .entry(name.to_string())
                .or_default()
                .push(notice.content.clone());
        }
        self.delivered_notices += 1;
    }

    /// Contents delivered on behalf of `source`, in delivery order
    pub fn delivered_to(&self, source: &str) -> &[NoticeContent] {
        self.delivered.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered_notices
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }
}

/// Summary of one run
#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: usize,
    pub fetch_failures: Vec<FetchFailure>,
    pub found: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Drives one run over every configured source: fetch, diff, merge,
/// dispatch and commit.
pub struct Runner<L: FailureLogRepository> {
    sources: Vec<Source>,
    failure_log: L,
    phase: Cell<RunPhase>,
}

impl<L: FailureLogRepository> Runner<L> {
    pub fn new(sources: Vec<Source>, failure_log: L) -> Self {
        Self {
            sources,
            failure_log,
            phase: Cell::new(RunPhase::Idle),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn phase(&self) -> RunPhase {
        self.phase.get()
    }

    /// New notices across all sources, merged by content, in the order
    /// they were first seen.
    pub fn collect_new(&self) -> Vec<Notice<'_>> {
        self.scan().0
    }

    /// Like `collect_new`, also returning the sources whose fetch failed.
    pub fn scan(&self) -> (Vec<Notice<'_>>, Vec<FetchFailure>) {
        self.phase.set(RunPhase::Fetching);
        info!(sources = self.sources.len(), "fetching sources");

        let fetched: Vec<FeederResult<Vec<NoticeContent>>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .sources
                .iter()
                .map(|source| scope.spawn(move || source.fetch_current()))
                .collect();

            handles
                .into_iter()
                .zip(&self.sources)
                .map(|(handle, source)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(FeederError::Fetch {
                            url: source.address().to_string(),
                            reason: "reader thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        self.phase.set(RunPhase::Diffing);
        let mut failures = Vec::new();
        let mut found = Vec::new();
        for (source, result) in self.sources.iter().zip(fetched) {
            match result {
                Ok(current) => {
                    let new = source.new_among(current);
                    debug!(source = %source.name(), new = new.len(), "diffed against history");
                    found.push((source, new));
                }
                Err(error) => {
                    warn!(source = %source.name(), %error, "fetch failed, skipping source");
                    failures.push(FetchFailure {
                        source: source.name().to_string(),
                        error,
                    });
                }
            }
        }

        self.phase.set(RunPhase::Aggregating);
        let notices = aggregate(found);
        info!(
            notices = notices.len(),
            failed_sources = failures.len(),
            "collected new notices"
        );
        (notices, failures)
    }

    /// Send every notice through its dispatchers, oldest first. Each
    /// dispatcher gets its own thread and sees its notices in order.
    pub fn dispatch_all(&self, notices: &[Notice<'_>]) -> DispatchOutcome {
        self.phase.set(RunPhase::Dispatching);
        let chronological: Vec<&Notice<'_>> = notices.iter().rev().collect();

        let mut lanes: Vec<(Arc<dyn Dispatcher>, Vec<usize>)> = Vec::new();
        for (idx, notice) in chronological.iter().enumerate() {
            for dispatcher in notice.dispatchers() {
                match lanes.iter_mut().find(|(d, _)| d.name() == dispatcher.name()) {
                    Some((_, queue)) => queue.push(idx),
                    None => lanes.push((dispatcher, vec![idx])),
                }
            }
        }

        let results: Vec<(&str, Vec<(usize, bool)>)> = thread::scope(|scope| {
            let chronological = &chronological;
            let handles: Vec<_> = lanes
                .iter()
                .map(|(dispatcher, queue)| {
                    scope.spawn(move || {
                        queue
                            .iter()
                            .map(|&idx| {
                                let notice = chronological[idx];
                                let sent = dispatcher.send(notice);
                                if sent {
                                    debug!(dispatcher = %dispatcher.name(), notice = %notice.content, "sent");
                                } else {
                                    warn!(dispatcher = %dispatcher.name(), notice = %notice.content, "delivery failed");
                                }
                                (idx, sent)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(&lanes)
                .map(|(handle, (dispatcher, queue))| {
                    let sent = handle.join().unwrap_or_else(|_| {
                        error!(dispatcher = %dispatcher.name(), "dispatcher thread panicked");
                        queue.iter().map(|&idx| (idx, false)).collect()
                    });
                    (dispatcher.name(), sent)
                })
                .collect()
        });

        let mut succeeded = vec![false; chronological.len()];
        let mut failed: Vec<Vec<String>> = vec![Vec::new(); chronological.len()];
        for (name, sent) in results {
            for (idx, ok) in sent {
                if ok {
                    succeeded[idx] = true;
                } else {
                    failed[idx].push(name.to_string());
                }
            }
        }

        let mut outcome = DispatchOutcome::default();
        for (idx, notice) in chronological.iter().enumerate() {
            if succeeded[idx] {
                outcome.record_delivery(notice);
            }
            if !failed[idx].is_empty() {
                outcome.failures.push(FailureRecord::new(
                    notice.content.clone(),
                    std::mem::take(&mut failed[idx]),
                ));
            }
        }

        info!(
            delivered = outcome.delivered_count(),
            failed = outcome.failures.len(),
            "dispatch finished"
        );
        outcome
    }

    /// Record deliveries in every source's history, then append the
    /// failures. Stops at the first write that fails.
    pub fn commit(&mut self, mut outcome: DispatchOutcome) -> FeederResult<()> {
        self.phase.set(RunPhase::Committing);

        for source in &mut self.sources {
            let mut delivered = outcome.delivered.remove(source.name()).unwrap_or_default();
            delivered.reverse();
            if let Err(e) = source.commit(delivered) {
                error!(source = %source.name(), error = %e, "failed to commit history");
                return Err(e);
            }
        }

        if !outcome.failures.is_empty() {
            self.failure_log.append(&outcome.failures)?;
            info!(records = outcome.failures.len(), "appended failure log");
        }

        self.phase.set(RunPhase::Done);
        Ok(())
    }

    /// Full run. Dispatch failures and unreachable feeds are reported, not
    /// raised; persistence errors end the run.
    pub fn run(&mut self) -> FeederResult<RunReport> {
        let (notices, fetch_failures) = self.scan();
        let outcome = self.dispatch_all(&notices);
        let report = RunReport {
            sources: self.sources.len(),
            fetch_failures,
            found: notices.len(),
            delivered: outcome.delivered_count(),
            failed: outcome.failures.len(),
        };
        drop(notices);

        self.commit(outcome)?;
        Ok(report)
    }

    /// Record every new notice as delivered without sending anything.
    pub fn mark_seen(&mut self) -> FeederResult<RunReport> {
        let (notices, fetch_failures) = self.scan();
        let outcome = DispatchOutcome::assume_delivered(&notices);
        let report = RunReport {
            sources: self.sources.len(),
            fetch_failures,
            found: notices.len(),
            delivered: 0,
            failed: 0,
        };
        drop(notices);

        self.commit(outcome)?;
        Ok(report)
    }
}

/// Merge per-source findings by content, keeping first-seen order.
fn aggregate<'a>(found: Vec<(&'a Source, Vec<NoticeContent>)>) -> Vec<Notice<'a>> {
    let mut index: HashMap<NoticeContent, usize> = HashMap::new();
    let mut notices: Vec<Notice<'a>> = Vec::new();

    for (source, contents) in found {
        for content in contents {
            match index.get(&content) {
                Some(&at) => notices[at].add_source(source),
                None => {
                    index.insert(content.clone(), notices.len());
                    notices.push(Notice::new(content, source));
                }
            }
        }
    }

    notices
}
