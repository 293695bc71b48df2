use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::backend::Backend;
use crate::config::Config;
use crate::documents::{self, DocumentLoad, LoadEvent};
use crate::languages;
use crate::runner::{TranslationOutcome, TranslationRequest};
use crate::worker::{JobEvent, TranslationJob};

pub const READY: &str = "Ready to translate";
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Everything the window shows, independent of the widget toolkit.
pub struct AppState {
    pub config: Config,
    pub source_text: String,
    pub output_text: String,
    pub loaded_file: Option<String>,
    status: String,
    status_until: Option<Instant>,
    counter_override: Option<String>,
    progress: Option<u8>,
    job: Option<TranslationJob>,
    loading: Option<DocumentLoad>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_text: String::new(),
            output_text: String::new(),
            loaded_file: None,
            status: READY.to_string(),
            status_until: None,
            counter_override: None,
            progress: None,
            job: None,
            loading: None,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn is_translating(&self) -> bool {
        self.job.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn counter(&self) -> String {
        self.counter_override
            .clone()
            .unwrap_or_else(|| format!("Characters: {}", group_thousands(self.source_text.chars().count())))
    }

    pub fn source_changed(&mut self) {
        self.counter_override = None;
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
        self.status_until = None;
    }

    /// Shows `msg` until `ttl` has passed, then falls back to the idle text.
    pub fn flash_status(&mut self, msg: impl Into<String>, ttl: Duration) {
        self.status = msg.into();
        self.status_until = Some(Instant::now() + ttl);
    }

    pub fn tick(&mut self, now: Instant) {
        if self.status_until.is_some_and(|t| now >= t) {
            self.set_status(READY);
        }
    }

    pub fn start_translation(&mut self) -> bool {
        self.start_with(TranslationJob::spawn)
    }

    pub(crate) fn start_with(
        &mut self,
        spawn: impl FnOnce(TranslationRequest) -> Result<TranslationJob>,
    ) -> bool {
        if self.source_text.trim().is_empty() {
            self.set_status("⚠ Please enter text to translate");
            return false;
        }

        self.cancel_current();

        let target_name = self.config.target_lang.clone();
        let request = TranslationRequest {
            text: self.source_text.clone(),
            target_lang: languages::code_for(&target_name).to_string(),
            backend: self.config.backend,
            credentials: self.config.api_key().map(str::to_string),
        };
        log::info!("Translating to {} ({}) via {}", target_name, request.target_lang, request.backend);

        match spawn(request) {
            Ok(job) => {
                self.job = Some(job);
                self.progress = Some(0);
                self.set_status(format!("Translating to {target_name}..."));
                true
            }
            Err(e) => {
                log::error!("Could not start translation: {e:#}");
                self.finish(TranslationOutcome::Failure(format!("{e:#}")));
                false
            }
        }
    }

    /// Cancels the running job, if any, and forgets it.
    pub fn cancel_current(&mut self) {
        if let Some(job) = self.job.take() {
            log::debug!("Cleaning up previous job {}", job.id());
            job.cancel_and_wait(CANCEL_GRACE);
            self.progress = None;
        }
    }

    /// Applies worker and document loader events. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let loaded = self.poll_document();
        self.poll_job() || loaded
    }

    fn poll_job(&mut self) -> bool {
        let Some(job) = self.job.as_ref() else {
            return false;
        };
        // Checked before draining so a worker that exits between the two calls
        // has all its events already queued.
        let exited = job.is_finished();
        let events = job.drain();
        let mut changed = !events.is_empty();

        for ev in events {
            match ev {
                JobEvent::Status(s) => self.set_status(s),
                JobEvent::Progress(p) => self.progress = Some(p),
                JobEvent::Finished(outcome) => {
                    self.finish(outcome);
                    return true;
                }
            }
        }

        if exited {
            log::error!("Translation worker exited without a result");
            self.finish(TranslationOutcome::Failure("Translation worker stopped unexpectedly".into()));
            changed = true;
        }
        changed
    }

    fn finish(&mut self, outcome: TranslationOutcome) {
        self.job = None;
        self.progress = None;
        match outcome {
            TranslationOutcome::Success(text) => {
                let words = text.split_whitespace().count();
                self.counter_override = Some(format!(
                    "Words: {} | Characters: {}",
                    group_thousands(words),
                    group_thousands(self.source_text.chars().count())
                ));
                self.output_text = text;
                self.set_status("✓ Translation complete!");
            }
            TranslationOutcome::Failure(message) => {
                self.output_text = format!("Translation Error:\n\n{message}\n\nPlease try again.");
                self.set_status("⚠ Translation failed - Please try again");
            }
        }
    }

    pub fn swap_languages(&mut self) {
        std::mem::swap(&mut self.config.source_lang, &mut self.config.target_lang);
        self.flash_status("✓ Languages swapped", Duration::from_secs(2));
    }

    pub fn apply_settings(&mut self, backend: Backend, api_key: String) {
        self.config.backend = backend;
        self.config.deepl_api_key = api_key;
        log::info!("Backend set to {}", backend);
        self.flash_status(format!("✓ Backend set to: {}", backend.display_name()), Duration::from_secs(3));
    }

    pub fn paste_text(&mut self, text: Option<String>) {
        match text {
            Some(t) if !t.is_empty() => {
                self.source_text = t;
                self.source_changed();
                self.flash_status("✓ Pasted from clipboard", Duration::from_secs(2));
            }
            Some(_) => {}
            None => self.flash_status("Clipboard not available, use Ctrl+V", Duration::from_secs(2)),
        }
    }

    pub fn clear_source(&mut self) {
        self.source_text.clear();
        self.loaded_file = None;
        self.source_changed();
    }

    /// Reports `empty_msg` and returns false when there is no output yet.
    pub fn require_output(&mut self, empty_msg: &str) -> bool {
        if self.output_text.is_empty() {
            self.set_status(empty_msg);
            return false;
        }
        true
    }

    pub fn copyable_output(&mut self) -> Option<String> {
        self.require_output("Nothing to copy").then(|| self.output_text.clone())
    }

    pub fn mark_copied(&mut self) {
        self.flash_status("✓ Copied to clipboard!", Duration::from_secs(2));
    }

    pub fn save_output(&mut self, path: &Path) -> Result<()> {
        if !self.require_output("Nothing to save") {
            return Ok(());
        }
        documents::save_text(path, &self.output_text)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        log::info!("Saved translation to {}", path.display());
        self.set_status(format!("✓ Saved to {name}"));
        Ok(())
    }

    /// Starts reading `path` in the background; `poll` applies the result.
    pub fn load_document(&mut self, path: &Path) {
        self.loaded_file = Some(documents::display_name(path));
        match DocumentLoad::spawn(path.to_path_buf()) {
            Ok(load) => {
                self.loading = Some(load);
                self.set_status("Loading file...");
            }
            Err(e) => self.apply_load_event(LoadEvent::Done(Err(format!("{e:#}")))),
        }
    }

    fn poll_document(&mut self) -> bool {
        let Some(load) = self.loading.as_ref() else {
            return false;
        };
        let events = load.drain();
        let changed = !events.is_empty();
        for ev in events {
            self.apply_load_event(ev);
        }
        changed
    }

    fn apply_load_event(&mut self, ev: LoadEvent) {
        match ev {
            LoadEvent::Page { current, total } => self.set_status(format!("Loading page {current}/{total}...")),
            LoadEvent::Done(result) => {
                let name = self.loading.take().map(|l| l.name().to_string()).unwrap_or_default();
                match result {
                    Ok(text) => {
                        self.source_text = text;
                        self.set_status(format!("✓ Loaded: {name}"));
                    }
                    Err(e) => {
                        log::error!("Error loading file: {e}");
                        self.source_text = format!("Error loading file: {e}");
                        self.set_status("Error loading file");
                    }
                }
                self.source_changed();
            }
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            log::info!("Window closing, cancelling job {}", job.id());
            job.cancel();
        }
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{flaky, ScriptedTranslator};
    use crate::runner::RetryPolicy;
    use std::fs;

    fn state_with(text: &str) -> AppState {
        let mut state = AppState::new(Config::default());
        state.source_text = text.to_string();
        state
    }

    fn spawn_scripted(
        translator: ScriptedTranslator,
    ) -> impl FnOnce(TranslationRequest) -> Result<TranslationJob> {
        move |req| {
            TranslationJob::spawn_with(
                req,
                Box::new(translator),
                RetryPolicy { max_attempts: 3, initial_delay: Duration::ZERO },
            )
        }
    }

    fn wait_idle(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.is_translating() {
            assert!(Instant::now() < deadline, "job did not finish");
            state.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut state = state_with("   \n");
        assert!(!state.start_with(|_| panic!("must not spawn")));
        assert_eq!(state.status(), "⚠ Please enter text to translate");
        assert!(!state.is_translating());
    }

    #[test]
    fn request_carries_target_code_and_backend() {
        let mut state = state_with("Hello world");
        state.config.backend = Backend::DeepL;
        state.config.deepl_api_key = " key:fx ".into();
        state.config.target_lang = "Portuguese".into();
        let mut seen = None;
        state.start_with(|req| {
            seen = Some(req.clone());
            TranslationJob::spawn_with(req, Box::new(ScriptedTranslator::upper()), RetryPolicy::default())
        });
        let req = seen.unwrap();
        assert_eq!(req.target_lang, "pt");
        assert_eq!(req.backend, Backend::DeepL);
        assert_eq!(req.credentials.as_deref(), Some("key:fx"));
        assert_eq!(state.status(), "Translating to Portuguese...");
        assert_eq!(state.progress(), Some(0));
        wait_idle(&mut state);
    }

    #[test]
    fn success_fills_output_and_counter() {
        let mut state = state_with("Hello world");
        let translator = ScriptedTranslator::new(|_, _| Ok("Hola mundo".into()));
        assert!(state.start_with(spawn_scripted(translator)));
        wait_idle(&mut state);

        assert_eq!(state.output_text, "Hola mundo");
        assert_eq!(state.status(), "✓ Translation complete!");
        assert_eq!(state.counter(), "Words: 2 | Characters: 11");
        assert_eq!(state.progress(), None);

        state.source_changed();
        assert_eq!(state.counter(), "Characters: 11");
    }

    #[test]
    fn failure_is_shown_in_place_of_output() {
        let mut state = state_with("Hello");
        assert!(state.start_with(spawn_scripted(ScriptedTranslator::new(|_, _| Err(flaky())))));
        wait_idle(&mut state);

        assert!(state.output_text.starts_with("Translation Error:\n\nTranslation failed after 3 attempts."));
        assert!(state.output_text.ends_with("\n\nPlease try again."));
        assert_eq!(state.status(), "⚠ Translation failed - Please try again");
    }

    #[test]
    fn dead_worker_is_reported_as_failure() {
        let mut state = state_with("Hello");
        assert!(state.start_with(spawn_scripted(ScriptedTranslator::new(|_, _| panic!("kaboom")))));
        wait_idle(&mut state);
        assert!(state.output_text.contains("Translation worker stopped unexpectedly"));
    }

    #[test]
    fn new_run_replaces_the_previous_one() {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let mut state = state_with(&"s".repeat(crate::runner::CHUNK_LIMIT * 2));
        let slow = ScriptedTranslator::new(move |_, _| {
            let _ = gate_rx.recv_timeout(Duration::from_millis(200));
            Ok("stale".into())
        });
        assert!(state.start_with(spawn_scripted(slow)));
        let first_id = state.job.as_ref().map(TranslationJob::id);

        state.source_text = "fresh".into();
        let _ = gate_tx.send(());
        assert!(state.start_with(spawn_scripted(ScriptedTranslator::new(|_, c| Ok(c.to_uppercase())))));
        assert_ne!(state.job.as_ref().map(TranslationJob::id), first_id);
        wait_idle(&mut state);
        assert_eq!(state.output_text, "FRESH");
    }

    #[test]
    fn statuses_flash_then_reset() {
        let mut state = AppState::new(Config::default());
        state.apply_settings(Backend::DeepL, "k".into());
        assert_eq!(state.status(), "✓ Backend set to: DeepL API");
        state.tick(Instant::now());
        assert_eq!(state.status(), "✓ Backend set to: DeepL API");
        state.tick(Instant::now() + Duration::from_secs(4));
        assert_eq!(state.status(), READY);
    }

    #[test]
    fn swap_exchanges_languages() {
        let mut state = AppState::new(Config::default());
        state.swap_languages();
        assert_eq!(state.config.source_lang, "Spanish");
        assert_eq!(state.config.target_lang, "English");
    }

    #[test]
    fn paste_uses_native_clipboard_when_present() {
        let mut state = state_with("old");
        if crate::clipboard::write_string("from the clipboard") {
            state.paste_text(crate::clipboard::read_string());
            assert_eq!(state.source_text, "from the clipboard");
        }
        state.paste_text(None);
        assert_eq!(state.status(), "Clipboard not available, use Ctrl+V");
    }

    fn wait_for_load(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.is_loading() {
            assert!(Instant::now() < deadline, "document load never finished");
            state.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn paste_ignores_empty_clipboard() {
        let mut state = state_with("keep");
        state.paste_text(Some(String::new()));
        assert_eq!(state.source_text, "keep");
        state.paste_text(Some("pasted".into()));
        assert_eq!(state.source_text, "pasted");
        assert_eq!(state.status(), "✓ Pasted from clipboard");
    }

    #[test]
    fn save_and_copy_need_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation.txt");
        let mut state = AppState::new(Config::default());

        state.save_output(&path).unwrap();
        assert_eq!(state.status(), "Nothing to save");
        assert!(!path.exists());
        assert_eq!(state.copyable_output(), None);
        assert_eq!(state.status(), "Nothing to copy");

        state.output_text = "Hola".into();
        state.save_output(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Hola");
        assert_eq!(state.status(), "✓ Saved to translation.txt");
        assert_eq!(state.copyable_output().as_deref(), Some("Hola"));
    }

    #[test]
    fn loading_documents_updates_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "Hello from a file").unwrap();
        let mut state = AppState::new(Config::default());

        state.load_document(&path);
        assert!(state.is_loading());
        wait_for_load(&mut state);
        assert_eq!(state.source_text, "Hello from a file");
        assert_eq!(state.loaded_file.as_deref(), Some("notes.txt"));
        assert_eq!(state.status(), "✓ Loaded: notes.txt");

        state.load_document(&dir.path().join("missing.txt"));
        wait_for_load(&mut state);
        assert!(state.source_text.starts_with("Error loading file: "));
        assert_eq!(state.status(), "Error loading file");
    }

    #[test]
    fn pdf_pages_are_reported_in_status() {
        let mut state = AppState::new(Config::default());
        state.apply_load_event(LoadEvent::Page { current: 2, total: 5 });
        assert_eq!(state.status(), "Loading page 2/5...");
        state.apply_load_event(LoadEvent::Done(Ok("page text".into())));
        assert_eq!(state.source_text, "page text");
        assert!(!state.is_loading());
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
