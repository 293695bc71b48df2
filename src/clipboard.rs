#[cfg(not(windows))]
use std::cell::RefCell;

// X11 and Wayland only serve the selection while the owning handle lives,
// so one handle is kept per thread.
#[cfg(not(windows))]
thread_local! {
    static CLIPBOARD: RefCell<Option<arboard::Clipboard>> = const { RefCell::new(None) };
}

#[cfg(not(windows))]
fn with_clipboard<T>(f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>) -> Option<T> {
    CLIPBOARD.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            match arboard::Clipboard::new() {
                Ok(cb) => *slot = Some(cb),
                Err(e) => {
                    log::warn!("Clipboard unavailable: {e}");
                    return None;
                }
            }
        }
        let cb = slot.as_mut()?;
        match f(cb) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Clipboard error: {e}");
                None
            }
        }
    })
}

pub fn read_string() -> Option<String> {
    #[cfg(windows)]
    {
        clipboard_win::get_clipboard_string().ok()
    }
    #[cfg(not(windows))]
    {
        with_clipboard(|cb| cb.get_text())
    }
}

/// Returns false when the native clipboard is unavailable; callers fall back to egui's.
pub fn write_string(s: &str) -> bool {
    #[cfg(windows)]
    {
        clipboard_win::set_clipboard_string(s).is_ok()
    }
    #[cfg(not(windows))]
    {
        with_clipboard(|cb| cb.set_text(s)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Headless machines have no clipboard; only check the round trip where one exists.
    #[test]
    fn written_text_can_be_pasted_back() {
        let text = "Translator Pro clipboard check";
        if write_string(text) {
            assert_eq!(read_string().as_deref(), Some(text));
        }
    }
}
