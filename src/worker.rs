use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::backend::Translator;
use crate::runner::{self, CancelFlag, RetryPolicy, RunEvent, TranslationOutcome, TranslationRequest};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Messages a worker thread sends back to the UI, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Status(String),
    Progress(u8),
    Finished(TranslationOutcome),
}

impl From<RunEvent> for JobEvent {
    fn from(ev: RunEvent) -> Self {
        match ev {
            RunEvent::Status(s) => JobEvent::Status(s),
            RunEvent::Progress(p) => JobEvent::Progress(p),
        }
    }
}

/// Handle to one background translation run.
///
/// Dropping the handle detaches the worker; its remaining events are discarded.
pub struct TranslationJob {
    id: u64,
    cancel: CancelFlag,
    events: Receiver<JobEvent>,
    // Never sent on; disconnects when the worker thread exits.
    done: Receiver<()>,
}

impl TranslationJob {
    pub fn spawn(request: TranslationRequest) -> Result<Self> {
        let translator = request.backend.translator(request.credentials.as_deref());
        Self::spawn_with(request, translator, RetryPolicy::default())
    }

    pub fn spawn_with(
        request: TranslationRequest,
        translator: Box<dyn Translator>,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelFlag::default();
        let (tx, events) = crossbeam_channel::unbounded::<JobEvent>();
        let (done_tx, done) = crossbeam_channel::bounded::<()>(0);

        let worker_cancel = cancel.clone();
        thread::Builder::new()
            .name(format!("translation-job-{id}"))
            .spawn(move || {
                let _done = done_tx;
                log::debug!("Job {id}: worker started ({})", translator.name());
                let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Job {id}: runtime failed: {e}");
                        let _ = tx.send(JobEvent::Finished(TranslationOutcome::Failure(format!(
                            "Could not start translation runtime: {e}"
                        ))));
                        return;
                    }
                };

                let outcome = rt.block_on(runner::run(
                    &request.text,
                    &request.target_lang,
                    translator.as_ref(),
                    &policy,
                    &worker_cancel,
                    |ev| {
                        let _ = tx.send(ev.into());
                    },
                ));

                match outcome {
                    Some(outcome) => {
                        let _ = tx.send(JobEvent::Finished(outcome));
                    }
                    None => log::info!("Job {id}: cancelled, no outcome delivered"),
                }
            })
            .context("failed to spawn translation worker")?;

        log::info!("Job {id}: spawned");
        Ok(Self { id, cancel, events, done })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Events received so far, without blocking.
    pub fn drain(&self) -> Vec<JobEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Signals cancellation and waits up to `timeout` for the worker to exit.
    /// Returns whether it exited in time.
    pub fn cancel_and_wait(&self, timeout: Duration) -> bool {
        self.cancel();
        let exited = matches!(self.done.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected));
        if !exited {
            log::warn!("Job {}: still busy after {:?}, detaching", self.id, timeout);
        }
        exited
    }
}
