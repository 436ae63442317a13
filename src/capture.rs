// src/capture.rs

use std::time::Instant;

use image::{DynamicImage, ImageBuffer, RgbaImage, imageops};
use log::{debug, info};
use xcap::Monitor;

use crate::error::{CaptureError, CropError};
use crate::selection_logic::Rect;

/// 冻结的截图，以及其左上角在虚拟桌面上的位置
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pixels: RgbaImage,
    origin: (i32, i32),
    scale: f64,
}

impl CapturedImage {
    pub fn new(pixels: RgbaImage, origin: (i32, i32)) -> Self {
        CapturedImage { pixels, origin, scale: 1.0 }
    }

    /// Physical pixels per desktop unit of the overlay window.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Cuts the selected rectangle out of the capture.
    pub fn crop(&self, rect: Rect) -> Result<DynamicImage, CropError> {
        let (w, h) = (rect.width(), rect.height());
        if w == 0 || h == 0 {
            return Err(CropError::ZeroDimension);
        }
        if rect.x2 > self.width() || rect.y2 > self.height() {
            return Err(CropError::OutOfBounds {
                requested: (rect.x1, rect.y1, w, h),
                image_size: (self.width(), self.height()),
            });
        }
        let cropped = imageops::crop_imm(&self.pixels, rect.x1, rect.y1, w, h).to_image();
        Ok(DynamicImage::ImageRgba8(cropped))
    }
}

/// Anything that can produce a screenshot of the whole virtual desktop.
pub trait CaptureSource {
    fn grab(&self) -> Result<CapturedImage, CaptureError>;
}

/// Captures every monitor with `xcap` and lays them out on one canvas.
pub struct XcapSource;

struct Shot {
    x: i32,
    y: i32,
    scale: f64,
    image: RgbaImage,
}

// CGDisplayBounds positions are in points; elsewhere xcap reports pixels
fn reports_logical_positions() -> bool {
    cfg!(target_os = "macos")
}

impl CaptureSource for XcapSource {
    fn grab(&self) -> Result<CapturedImage, CaptureError> {
        let started = Instant::now();
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        if monitors.is_empty() {
            return Err(CaptureError::NoMonitor);
        }

        let mut shots = Vec::with_capacity(monitors.len());
        for mon in &monitors {
            let name = mon.name().unwrap_or_else(|_| "<unknown>".to_string());
            let failed = |e: xcap::XCapError| CaptureError::CaptureFailed {
                monitor: name.clone(),
                reason: e.to_string(),
            };
            let x = mon.x().map_err(failed)?;
            let y = mon.y().map_err(failed)?;
            let scale = if reports_logical_positions() {
                mon.scale_factor().map_err(failed)? as f64
            } else {
                1.0
            };
            let img = mon.capture_image().map_err(failed)?;
            let (w, h) = (img.width(), img.height());
            debug!("Monitor {name} at ({x}, {y}) scale {scale} captured {w}x{h}");

            // xcap links its own image version, go through raw bytes
            let raw = img.into_raw();
            let image: RgbaImage = ImageBuffer::from_raw(w, h, raw)
                .ok_or(CaptureError::BufferMismatch { width: w, height: h })?;
            shots.push(Shot { x, y, scale, image });
        }

        let captured = compose(shots).ok_or(CaptureError::NoMonitor)?;
        info!(
            "Screen captured in {}ms: {}x{} at {:?} scale {}",
            started.elapsed().as_millis(),
            captured.width(),
            captured.height(),
            captured.origin(),
            captured.scale()
        );
        Ok(captured)
    }
}

impl Shot {
    /// Top-left corner in canvas pixels.
    fn pixel_origin(&self) -> (i64, i64) {
        (
            (self.x as f64 * self.scale).round() as i64,
            (self.y as f64 * self.scale).round() as i64,
        )
    }
}

/// Places each monitor's image at its desktop position on a shared canvas.
/// Positions are scaled into pixels so HiDPI shots neither overlap nor leave gaps.
fn compose(shots: Vec<Shot>) -> Option<CapturedImage> {
    let origins: Vec<(i64, i64)> = shots.iter().map(Shot::pixel_origin).collect();
    let left = origins.iter().map(|o| o.0).min()?;
    let top = origins.iter().map(|o| o.1).min()?;
    let right = shots
        .iter()
        .zip(&origins)
        .map(|(s, o)| o.0 + s.image.width() as i64)
        .max()?;
    let bottom = shots
        .iter()
        .zip(&origins)
        .map(|(s, o)| o.1 + s.image.height() as i64)
        .max()?;

    let width = (right - left) as u32;
    let height = (bottom - top) as u32;
    let mut canvas = RgbaImage::new(width, height);
    for (shot, (px, py)) in shots.iter().zip(&origins) {
        imageops::replace(&mut canvas, &shot.image, px - left, py - top);
    }

    let desktop_left = shots.iter().map(|s| s.x).min()?;
    let desktop_top = shots.iter().map(|s| s.y).min()?;
    let scale = shots.iter().map(|s| s.scale).fold(1.0_f64, f64::max);
    Some(CapturedImage::new(canvas, (desktop_left, desktop_top)).with_scale(scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn shot(x: i32, y: i32, w: u32, h: u32, v: u8) -> Shot {
        scaled_shot(x, y, 1.0, w, h, v)
    }

    fn scaled_shot(x: i32, y: i32, scale: f64, w: u32, h: u32, v: u8) -> Shot {
        Shot { x, y, scale, image: RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255])) }
    }

    #[test]
    fn single_monitor_keeps_its_origin() {
        let img = compose(vec![shot(0, 0, 1920, 1080, 7)]).unwrap();
        assert_eq!((img.width(), img.height()), (1920, 1080));
        assert_eq!(img.origin(), (0, 0));
    }

    #[test]
    fn monitor_left_of_primary_gives_negative_origin() {
        let img = compose(vec![
            shot(0, 0, 1920, 1080, 1),
            shot(-1280, 200, 1280, 1024, 2),
        ])
        .unwrap();
        assert_eq!(img.origin(), (-1280, 0));
        assert_eq!((img.width(), img.height()), (3200, 1224));
        assert_eq!(img.pixels().get_pixel(0, 200)[0], 2);
        assert_eq!(img.pixels().get_pixel(1280, 0)[0], 1);
        // gap below the primary monitor stays transparent black
        assert_eq!(img.pixels().get_pixel(3000, 1200)[3], 0);
    }

    #[test]
    fn retina_display_keeps_physical_pixels() {
        let img = compose(vec![scaled_shot(0, 0, 2.0, 2880, 1800, 3)]).unwrap();
        assert_eq!((img.width(), img.height()), (2880, 1800));
        assert_eq!(img.origin(), (0, 0));
        assert_eq!(img.scale(), 2.0);
    }

    #[test]
    fn retina_monitors_are_placed_in_pixels() {
        // two 1440x900pt displays side by side, positions in points
        let img = compose(vec![
            scaled_shot(0, 0, 2.0, 2880, 1800, 1),
            scaled_shot(1440, 0, 2.0, 2880, 1800, 2),
        ])
        .unwrap();
        assert_eq!((img.width(), img.height()), (5760, 1800));
        assert_eq!(img.pixels().get_pixel(2879, 900)[0], 1);
        assert_eq!(img.pixels().get_pixel(2880, 900)[0], 2);
        assert_eq!(img.pixels().get_pixel(5759, 1799)[0], 2);
    }

    #[test]
    fn bad_scale_falls_back_to_one() {
        let img = CapturedImage::new(RgbaImage::new(4, 4), (0, 0)).with_scale(0.0);
        assert_eq!(img.scale(), 1.0);
    }

    #[test]
    fn no_monitors_compose_to_nothing() {
        assert!(compose(Vec::new()).is_none());
    }

    #[test]
    fn crop_valid_region() {
        let mut pixels = RgbaImage::new(100, 100);
        pixels.put_pixel(10, 10, Rgba([9, 8, 7, 255]));
        let img = CapturedImage::new(pixels, (0, 0));
        let cropped = img.crop(Rect { x1: 10, y1: 10, x2: 60, y2: 40 }).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (50, 30));
        assert_eq!(cropped.to_rgba8().get_pixel(0, 0), &Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn crop_full_image_is_in_bounds() {
        let img = CapturedImage::new(RgbaImage::new(100, 100), (-50, -50));
        assert!(img.crop(Rect { x1: 0, y1: 0, x2: 100, y2: 100 }).is_ok());
    }

    #[test]
    fn crop_zero_dimension_fails() {
        let img = CapturedImage::new(RgbaImage::new(100, 100), (0, 0));
        let result = img.crop(Rect { x1: 5, y1: 5, x2: 5, y2: 50 });
        assert!(matches!(result, Err(CropError::ZeroDimension)));
    }

    #[test]
    fn crop_out_of_bounds_fails() {
        let img = CapturedImage::new(RgbaImage::new(100, 100), (0, 0));
        let result = img.crop(Rect { x1: 80, y1: 80, x2: 110, y2: 110 });
        assert!(matches!(result, Err(CropError::OutOfBounds { .. })));
    }
}
