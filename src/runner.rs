use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, Translator};

/// Maximum characters sent to a backend in one call.
pub const CHUNK_LIMIT: usize = 4500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_lang: String,
    pub backend: Backend,
    pub credentials: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Success(String),
    Failure(String),
}

/// Intermediate notifications emitted while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Status(String),
    Progress(u8),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay: Duration::from_secs(2) }
    }
}

/// Cooperative cancellation shared between the UI and one worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed-width slicing on character boundaries. Concatenating the result yields `text`.
pub fn chunk_text(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Translates `text` chunk by chunk.
///
/// Returns `None` when the run was cancelled at a chunk boundary; otherwise exactly
/// one outcome. Events are delivered in order through `on_event`.
pub async fn run(
    text: &str,
    target_lang: &str,
    translator: &dyn Translator,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    mut on_event: impl FnMut(RunEvent),
) -> Option<TranslationOutcome> {
    let chunks = chunk_text(text, CHUNK_LIMIT);
    let total = chunks.len();
    log::info!(
        "Translating {} chars in {} chunk(s) via {} to {}",
        text.chars().count(),
        total,
        translator.name(),
        target_lang
    );
    on_event(RunEvent::Status(format!("Translating {total} chunk(s)...")));

    let mut translated = String::with_capacity(text.len());
    for (i, chunk) in chunks.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("Translation cancelled before chunk {}/{}", i + 1, total);
            return None;
        }

        on_event(RunEvent::Status(format!("Processing chunk {}/{}...", i + 1, total)));
        match translate_with_retry(chunk, target_lang, translator, policy, i + 1, &mut on_event).await {
            Ok(out) => {
                translated.push_str(&out);
                translated.push(' ');
            }
            Err(message) => {
                log::error!("Chunk {}/{} failed: {}", i + 1, total, message);
                return Some(TranslationOutcome::Failure(message));
            }
        }

        let percent = ((i + 1) * 100 / total) as u8;
        on_event(RunEvent::Progress(percent));
    }

    log::info!("Translation complete ({} chunk(s))", total);
    Some(TranslationOutcome::Success(translated.trim_end().to_string()))
}

async fn translate_with_retry(
    chunk: &str,
    target_lang: &str,
    translator: &dyn Translator,
    policy: &RetryPolicy,
    chunk_no: usize,
    on_event: &mut impl FnMut(RunEvent),
) -> Result<String, String> {
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            on_event(RunEvent::Status(format!(
                "Retry {}/{} for chunk {}...",
                attempt,
                max_attempts - 1,
                chunk_no
            )));
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        match translator.translate(chunk, target_lang).await {
            Ok(out) => return Ok(out),
            Err(e) if !e.is_retryable() => return Err(e.to_string()),
            Err(e) => {
                attempt += 1;
                log::warn!("Chunk {} attempt {} failed: {}", chunk_no, attempt, e);
                if attempt >= max_attempts {
                    return Err(format!(
                        "Translation failed after {max_attempts} attempts. Error: {e}"
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::backend::Translator;
    use crate::error::TranslateError;

    type Respond = dyn Fn(usize, &str) -> Result<String, TranslateError> + Send + Sync;

    /// Answers from a closure that sees the 1-based call number and the chunk.
    pub struct ScriptedTranslator {
        calls: AtomicUsize,
        respond: Box<Respond>,
    }

    impl ScriptedTranslator {
        pub fn new(
            respond: impl Fn(usize, &str) -> Result<String, TranslateError> + Send + Sync + 'static,
        ) -> Self {
            Self { calls: AtomicUsize::new(0), respond: Box::new(respond) }
        }

        pub fn upper() -> Self {
            Self::new(|_, chunk| Ok(chunk.to_uppercase()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for ScriptedTranslator {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn translate(&self, chunk: &str, _target_lang: &str) -> Result<String, TranslateError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.respond)(n, chunk)
        }
    }

    pub fn flaky() -> TranslateError {
        TranslateError::UnexpectedResponse("connection reset".into())
    }
}
