// src/session.rs

use std::fmt;

use log::{info, warn};

use crate::capture::{CaptureSource, CapturedImage};
use crate::clipboard::ClipboardSink;
use crate::error::{RecognitionError, SessionError};
use crate::ocr::Recognizer;
use crate::selection::{OverlayEnd, OverlayStyle, SelectionOverlay};
use crate::selection_logic::{Extraction, Point, Rect, extract};

/// Terminal result of one snip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Overlay closed before any selection was released.
    Cancelled,
    Rejected { width: u32, height: u32 },
    Empty,
    Success(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Cancelled => write!(f, "Selection cancelled."),
            Outcome::Rejected { .. } => write!(f, "Selection too small."),
            Outcome::Empty => write!(f, "OCR finished, but no text found."),
            Outcome::Success(text) => {
                writeln!(f, "OCR SUCCESS:")?;
                writeln!(f, "----------------------------")?;
                writeln!(f, "{text}")?;
                write!(f, "----------------------------")
            }
            Outcome::Failed(message) => write!(f, "Error: {message}"),
        }
    }
}

/// One capture, one selection, one recognition.
pub struct SnipSession<R, C> {
    recognizer: R,
    clipboard: C,
    style: OverlayStyle,
}

impl<R: Recognizer, C: ClipboardSink> SnipSession<R, C> {
    pub fn new(recognizer: R, clipboard: C) -> Self {
        SnipSession { recognizer, clipboard, style: OverlayStyle::default() }
    }

    /// Captures the screen, lets the user select, and processes the result.
    /// Only failures before the overlay is up are returned as errors.
    pub fn run(mut self, source: &impl CaptureSource) -> Result<Outcome, SessionError> {
        let image = source.grab()?;
        let (image, end) = SelectionOverlay::new(image, self.style).run()?;
        let selection = match end {
            OverlayEnd::Released { begin, end } => Some((begin, end)),
            OverlayEnd::Cancelled => None,
        };
        Ok(self.finish(&image, selection))
    }

    /// Everything after the overlay has closed: extract, crop, recognize, copy.
    pub fn finish(&mut self, image: &CapturedImage, selection: Option<(Point, Point)>) -> Outcome {
        let Some((begin, end)) = selection else {
            return Outcome::Cancelled;
        };
        let rect = match extract(begin, end) {
            Extraction::Accepted(rect) => rect,
            Extraction::TooSmall { width, height } => {
                info!("Selection {width}x{height} rejected");
                return Outcome::Rejected { width, height };
            }
        };
        info!("Selected {}x{} at ({}, {})", rect.width(), rect.height(), rect.x1, rect.y1);

        let text = match self.read(image, rect) {
            Ok(text) => text,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Empty;
        }

        match self.clipboard.set_text(text) {
            Ok(()) => Outcome::Success(text.to_string()),
            Err(e) => {
                warn!("Recognized text was not copied: {text}");
                Outcome::Failed(e.to_string())
            }
        }
    }

    fn read(&self, image: &CapturedImage, rect: Rect) -> Result<String, RecognitionError> {
        let cropped = image.crop(rect)?;
        self.recognizer.recognize(&cropped)
    }
}
