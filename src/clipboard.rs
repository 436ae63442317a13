// src/clipboard.rs

use arboard::Clipboard;

use crate::error::ClipboardError;

pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard. Opened lazily so a session that never copies never touches it.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = match &mut self.inner {
            Some(c) => c,
            slot => slot.insert(Clipboard::new()?),
        };
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}
