// src/ocr.rs

use image::DynamicImage;
use log::debug;
use rusty_tesseract::{Args, Image};

use crate::error::RecognitionError;

/// Text recognition engine. May return an empty string when nothing is readable.
pub trait Recognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError>;
}

/// Runs the `tesseract` executable with its default settings.
#[derive(Default)]
pub struct Tesseract {
    args: Args,
}

impl Tesseract {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Recognizer for Tesseract {
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        let engine_err = |e: rusty_tesseract::TessError| RecognitionError::Engine(e.to_string());

        debug!("Running tesseract on {}x{} crop", image.width(), image.height());
        let input = Image::from_dynamic_image(image).map_err(engine_err)?;
        rusty_tesseract::image_to_string(&input, &self.args).map_err(engine_err)
    }
}
