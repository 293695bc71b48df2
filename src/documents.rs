use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Reads a `.pdf` page by page or any other file as UTF-8 text.
/// `on_page(current, total)` runs before each PDF page is read.
pub fn load_text(path: &Path, on_page: impl FnMut(usize, usize)) -> Result<String> {
    if is_pdf(path) {
        load_pdf(path, on_page)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn load_pdf(path: &Path, mut on_page: impl FnMut(usize, usize)) -> Result<String> {
    let doc = lopdf::Document::load(path).with_context(|| format!("opening PDF {}", path.display()))?;
    let pages = doc.get_pages();
    let total = pages.len();
    let mut text = String::new();
    for (i, page_no) in pages.keys().enumerate() {
        log::debug!("Loading page {}/{}...", i + 1, total);
        on_page(i + 1, total);
        let page = doc
            .extract_text(&[*page_no])
            .with_context(|| format!("extracting text from page {page_no}"))?;
        text.push_str(&page);
        text.push('\n');
    }
    log::info!("Extracted {} page(s) from {}", total, path.display());
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Page { current: usize, total: usize },
    Done(Result<String, String>),
}

/// A document being read on a background thread.
pub struct DocumentLoad {
    name: String,
    events: Receiver<LoadEvent>,
}

impl DocumentLoad {
    pub fn spawn(path: PathBuf) -> Result<Self> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let (tx, events) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("document-load".into())
            .spawn(move || {
                let result = load_text(&path, |current, total| {
                    let _ = tx.send(LoadEvent::Page { current, total });
                });
                let _ = tx.send(LoadEvent::Done(result.map_err(|e| format!("{e:#}"))));
            })
            .context("failed to spawn document loader")?;
        Ok(Self { name, events })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events received so far. A loader that exits without `Done` is reported as a failure.
    pub fn drain(&self) -> Vec<LoadEvent> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(ev) => {
                    let done = matches!(ev, LoadEvent::Done(_));
                    out.push(ev);
                    if done {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    out.push(LoadEvent::Done(Err("document loader stopped unexpectedly".into())));
                    break;
                }
            }
        }
        out
    }
}

pub fn save_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// File name for the UI, shortened past 25 characters.
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.chars().count() > 25 {
        let head: String = name.chars().take(22).collect();
        format!("{head}...")
    } else {
        name
    }
}
