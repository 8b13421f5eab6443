//! Background thread that runs backend requests off the event loop.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use booklog_application::{LogBackend, LogRequest};
use booklog_core::{Book, ReadingLog};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    FetchBooks,
    FetchLogs { ticket: u64 },
    Write { ticket: u64, request: LogRequest },
}

#[derive(Debug)]
pub enum JobResult {
    Books(anyhow::Result<Vec<Book>>),
    Logs {
        ticket: u64,
        result: anyhow::Result<Vec<ReadingLog>>,
    },
    Written {
        ticket: u64,
        result: anyhow::Result<()>,
    },
}

/// Jobs run one at a time in submission order. The thread exits once the
/// worker is dropped and its queue drains.
#[derive(Debug)]
pub struct Worker {
    jobs: Sender<Job>,
    results: Receiver<JobResult>,
}

impl Worker {
    pub fn spawn(backend: Box<dyn LogBackend + Send>) -> anyhow::Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (result_tx, results) = mpsc::channel();

        thread::Builder::new()
            .name("booklog-worker".to_string())
            .spawn(move || {
                for job in job_rx {
                    let result = run_job(backend.as_ref(), job);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("worker stopped");
            })
            .context("spawn request worker")?;

        Ok(Self { jobs, results })
    }

    pub fn submit(&self, job: Job) -> anyhow::Result<()> {
        debug!(?job, "submitting job");
        self.jobs
            .send(job)
            .map_err(|_| anyhow::anyhow!("request worker has stopped"))
    }

    pub fn try_recv(&self) -> Option<JobResult> {
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn run_job(backend: &(dyn LogBackend + Send), job: Job) -> JobResult {
    match job {
        Job::FetchBooks => JobResult::Books(backend.list_books()),
        Job::FetchLogs { ticket } => JobResult::Logs {
            ticket,
            result: backend.list_logs(),
        },
        Job::Write { ticket, request } => JobResult::Written {
            ticket,
            result: request.execute(backend),
        },
    }
}
