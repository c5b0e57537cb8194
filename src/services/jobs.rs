use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Semaphore};
use tokio::task::JoinSet;

/// Progress notification emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum JobEvent {
    Started { item_id: String },
    Completed { item_id: String, detail: String },
    Failed { item_id: String, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub item_id: String,
    pub status: JobStatus,
    pub detail: String,
}

/// Summary of a finished batch; outcomes follow input order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub outcomes: Vec<JobOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Bounded-parallel batch runner
///
/// Each item runs as its own task; a semaphore caps how many run at once.
/// Every item ends in exactly one `Completed` or `Failed` outcome, including
/// items whose task panicked.
#[derive(Debug, Clone, Copy)]
pub struct JobRunner {
    max_parallel: usize,
}

impl JobRunner {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    pub async fn run<I, F, Fut>(
        &self,
        job: &str,
        items: Vec<(String, I)>,
        work: F,
        events: Option<UnboundedSender<JobEvent>>,
    ) -> JobReport
    where
        I: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        let started_at = Utc::now();
        let total = items.len();
        tracing::info!("Job {} starting: {} items, {} in parallel", job, total, self.max_parallel);

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let work = Arc::new(work);
        let mut ids = Vec::with_capacity(total);
        let mut set = JoinSet::new();

        for (index, (item_id, item)) in items.into_iter().enumerate() {
            ids.push(item_id.clone());
            let semaphore = semaphore.clone();
            let work = work.clone();
            let events = events.clone();

            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let outcome = failed(&events, item_id, "job runner shut down".to_string());
                        return (index, outcome);
                    }
                };

                emit(&events, JobEvent::Started { item_id: item_id.clone() });

                let outcome = match work(item).await {
                    Ok(detail) => {
                        emit(
                            &events,
                            JobEvent::Completed {
                                item_id: item_id.clone(),
                                detail: detail.clone(),
                            },
                        );
                        JobOutcome {
                            item_id,
                            status: JobStatus::Completed,
                            detail,
                        }
                    }
                    Err(error) => failed(&events, item_id, error),
                };

                (index, outcome)
            });
        }

        let mut slots: Vec<Option<JobOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!("Job {} task aborted: {}", job, e),
            }
        }

        let outcomes: Vec<JobOutcome> = slots
            .into_iter()
            .zip(ids)
            .map(|(slot, item_id)| {
                slot.unwrap_or_else(|| failed(&events, item_id, "task aborted".to_string()))
            })
            .collect();

        let completed = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Completed)
            .count();
        let failed_count = total - completed;

        tracing::info!(
            "Job {} finished: {} completed, {} failed",
            job,
            completed,
            failed_count
        );

        JobReport {
            job: job.to_string(),
            total,
            completed,
            failed: failed_count,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

fn emit(events: &Option<UnboundedSender<JobEvent>>, event: JobEvent) {
    if let Some(tx) = events {
        // receiver may have gone away; the report still carries everything
        let _ = tx.send(event);
    }
}

fn failed(events: &Option<UnboundedSender<JobEvent>>, item_id: String, error: String) -> JobOutcome {
    emit(
        events,
        JobEvent::Failed {
            item_id: item_id.clone(),
            error: error.clone(),
        },
    );
    JobOutcome {
        item_id,
        status: JobStatus::Failed,
        detail: error,
    }
}
