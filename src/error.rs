// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No monitor available")]
    NoMonitor,

    #[error("Screen capture failed on monitor {monitor}: {reason}")]
    CaptureFailed { monitor: String, reason: String },

    #[error("Captured buffer does not match its {width}x{height} size")]
    BufferMismatch { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to open selection overlay: {0}")]
    Window(#[from] minifb::Error),
}

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) exceeds image bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (u32, u32, u32, u32),
        image_size: (u32, u32),
    },
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Crop(#[from] CropError),

    #[error("Text recognition failed: {0}")]
    Engine(String),
}

#[derive(Debug, Error)]
#[error("Clipboard unavailable: {0}")]
pub struct ClipboardError(#[from] pub arboard::Error);

/// Failures that stop a session before the user can select anything.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}
