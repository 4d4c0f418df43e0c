//! Indexer: a bounded worker pool draining a job queue, with per-repository
//! coalescing so at most one job processes a repository at a time.

pub mod job;
pub mod retry;

pub use job::{run_index_job, IndexJobRequest};

use crate::config::Config;
use crate::error::Result;
use crate::models::IndexJob;
use crate::store::Store;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};

struct QueuedJob {
    job_id: String,
    repository_id: String,
    req: IndexJobRequest,
}

struct Queue {
    pending: VecDeque<QueuedJob>,
    in_flight_repos: HashSet<String>,
}

/// Runs `IndexJobRequest`s on a fixed-size worker pool (`config.worker_count`,
/// spec default 3). A request for a repository already `processing` is held
/// back until that job finishes, so a repository never has two jobs racing
/// on its rows.
pub struct Indexer {
    store: Arc<Store>,
    config: Arc<Config>,
    queue: Arc<Mutex<Queue>>,
    notify: Arc<Notify>,
}

impl Indexer {
    pub fn new(store: Arc<Store>, config: Arc<Config>) -> Self {
        Indexer {
            store,
            config,
            queue: Arc::new(Mutex::new(Queue {
                pending: VecDeque::new(),
                in_flight_repos: HashSet::new(),
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Create a `pending` job row and enqueue it, returning the job id
    /// immediately so a caller (the HTTP `/index` handler) can poll for
    /// completion while a worker runs the pipeline in the background.
    pub fn enqueue(&self, req: IndexJobRequest) -> Result<IndexJob> {
        let (job_id, repository_id) = job::create_job(&self.store, &req)?;
        let job = job::get_job(&self.store, &job_id)?.ok_or_else(|| {
            crate::error::KotaError::Internal("job row missing immediately after insert".into())
        })?;
        self.queue.lock().pending.push_back(QueuedJob {
            job_id,
            repository_id,
            req,
        });
        self.notify.notify_one();
        Ok(job)
    }

    /// Look up a job's current state.
    pub fn get_job(&self, job_id: &str) -> Result<Option<IndexJob>> {
        job::get_job(&self.store, job_id)
    }

    /// Spawn the worker pool. Returns immediately; workers run until the
    /// returned handles are dropped or aborted.
    pub fn spawn_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.worker_count)
            .map(|worker_id| {
                let store = self.store.clone();
                let config = self.config.clone();
                let queue = self.queue.clone();
                let notify = self.notify.clone();
                tokio::task::spawn_blocking(move || {
                    worker_loop(worker_id, store, config, queue, notify)
                })
            })
            .collect()
    }

    /// Run a single request synchronously, bypassing the queue. Used by
    /// the CLI's one-shot `index` command.
    pub fn run_once(&self, req: IndexJobRequest) -> Result<IndexJob> {
        run_index_job(&self.store, &self.config, req)
    }
}

fn claim_next(queue: &Mutex<Queue>) -> Option<QueuedJob> {
    let mut q = queue.lock();
    let idx = q
        .pending
        .iter()
        .position(|qj| !q.in_flight_repos.contains(&qj.req.full_name))?;
    let qj = q.pending.remove(idx).expect("index checked above");
    q.in_flight_repos.insert(qj.req.full_name.clone());
    Some(qj)
}

fn release(queue: &Mutex<Queue>, full_name: &str) {
    queue.lock().in_flight_repos.remove(full_name);
}

fn worker_loop(
    worker_id: usize,
    store: Arc<Store>,
    config: Arc<Config>,
    queue: Arc<Mutex<Queue>>,
    notify: Arc<Notify>,
) {
    let rt = match tokio::runtime::Handle::try_current() {
        Ok(h) => h,
        Err(_) => return,
    };
    loop {
        match claim_next(&queue) {
            Some(qj) => {
                let full_name = qj.req.full_name.clone();
                info!(worker_id, repository = %full_name, "claimed index job");
                match job::execute_job(&store, &config, &qj.job_id, &qj.repository_id, qj.req) {
                    Ok(job) => info!(worker_id, status = job.status.as_str(), "job finished"),
                    Err(e) => warn!(worker_id, error = %e, "job failed outside the pipeline's own error handling"),
                }
                release(&queue, &full_name);
            }
            None => {
                let notified = notify.notified();
                rt.block_on(notified);
            }
        }
    }
}
