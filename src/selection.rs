use log::{debug, info};
use minifb::{CursorStyle, Key, MouseButton, MouseMode, ScaleMode, Window, WindowOptions};

use crate::capture::CapturedImage;
use crate::error::OverlayError;
use crate::selection_logic::{Point, PointerTracker, Rect, SelectionState, Transition};

/// 覆盖层样式：遮罩透明度与边框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Opacity of the black tint outside the selection, out of 255.
    pub tint_alpha: u8,
    /// 0RGB border colour.
    pub border_color: u32,
    pub border_width: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        OverlayStyle { tint_alpha: 100, border_color: 0xFF0000, border_width: 2 }
    }
}

/// How a selection session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEnd {
    Released { begin: Point, end: Point },
    Cancelled,
}

/// 覆盖层帧缓冲：冻结的截图加上每帧重绘的遮罩和边框
pub struct Frame {
    width: usize,
    height: usize,
    backdrop: Vec<u32>,
    buffer: Vec<u32>,
}

impl Frame {
    pub fn new(image: &CapturedImage) -> Self {
        let backdrop: Vec<u32> = image
            .pixels()
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | (p[2] as u32))
            .collect();
        Frame {
            width: image.width() as usize,
            height: image.height() as usize,
            buffer: backdrop.clone(),
            backdrop,
        }
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    /// Redraws the whole frame for the given selection.
    pub fn compose(&mut self, selection: Option<Rect>, style: &OverlayStyle) {
        let keep = 255 - style.tint_alpha as u32;
        let dim = |c: u32| c * keep / 255;

        // blit, then tint everything outside the cutout
        for y in 0..self.height {
            let base = y * self.width;
            for x in 0..self.width {
                let pix = self.backdrop[base + x];
                let clear = selection.is_some_and(|r| r.contains(x as u32, y as u32));
                self.buffer[base + x] = if clear {
                    pix
                } else {
                    let r = dim((pix >> 16) & 0xFF);
                    let g = dim((pix >> 8) & 0xFF);
                    let b = dim(pix & 0xFF);
                    (r << 16) | (g << 8) | b
                };
            }
        }

        if let Some(rect) = selection {
            self.stroke(rect, style);
        }
    }

    /// Border centred on the rectangle edges, drawn over the tint.
    fn stroke(&mut self, rect: Rect, style: &OverlayStyle) {
        if style.border_width == 0 {
            return;
        }
        let outer = style.border_width / 2;
        let inner = style.border_width - outer;
        let (w, h) = (self.width as i64, self.height as i64);

        let ox0 = (rect.x1 as i64 - outer as i64).max(0);
        let oy0 = (rect.y1 as i64 - outer as i64).max(0);
        let ox1 = (rect.x2 as i64 + inner as i64).min(w);
        let oy1 = (rect.y2 as i64 + inner as i64).min(h);
        let ix0 = rect.x1 as i64 + inner as i64;
        let iy0 = rect.y1 as i64 + inner as i64;
        let ix1 = rect.x2 as i64 - outer as i64;
        let iy1 = rect.y2 as i64 - outer as i64;

        for y in oy0..oy1 {
            let base = y as usize * self.width;
            for x in ox0..ox1 {
                let interior = x >= ix0 && x < ix1 && y >= iy0 && y < iy1;
                if !interior {
                    self.buffer[base + x as usize] = style.border_color;
                }
            }
        }
    }
}

/// 全屏置顶的选区窗口，显示冻结的截图
pub struct SelectionOverlay {
    image: CapturedImage,
    style: OverlayStyle,
}

/// Window size in desktop units for an image of physical pixels.
fn window_size(image: &CapturedImage) -> (usize, usize) {
    let fit = |px: u32| ((px as f64 / image.scale()).round() as usize).max(1);
    (fit(image.width()), fit(image.height()))
}

impl SelectionOverlay {
    pub fn new(image: CapturedImage, style: OverlayStyle) -> Self {
        SelectionOverlay { image, style }
    }

    /// Runs one selection session. The window is gone by the time this returns,
    /// and the captured image is handed back for cropping.
    pub fn run(self) -> Result<(CapturedImage, OverlayEnd), OverlayError> {
        let (width, height) = (self.image.width(), self.image.height());
        let (offset_x, offset_y) = self.image.origin();
        let scale = self.image.scale();
        let (win_w, win_h) = window_size(&self.image);

        // the physical buffer is stretched onto a window sized in desktop units
        let mut window = Window::new(
            "snipocr",
            win_w,
            win_h,
            WindowOptions {
                borderless: true,
                title: false,
                resize: false,
                topmost: true,
                scale_mode: ScaleMode::Stretch,
                ..WindowOptions::default()
            },
        )?;
        window.set_position(offset_x as isize, offset_y as isize);
        window.set_cursor_style(CursorStyle::Crosshair);
        window.set_target_fps(60);
        info!(
            "Overlay opened at ({offset_x}, {offset_y}) size {win_w}x{win_h} for {width}x{height}px"
        );

        let mut frame = Frame::new(&self.image);
        let mut state = SelectionState::new();
        let mut tracker = PointerTracker::default();
        let mut dirty = true;
        let mut end = OverlayEnd::Cancelled;

        while window.is_open() {
            if window.is_key_down(Key::Escape) {
                info!("Selection cancelled");
                break;
            }

            let down = window.get_mouse_down(MouseButton::Left);
            let pos = window
                .get_mouse_pos(MouseMode::Clamp)
                .map(|(x, y)| Point::from_pointer(x, y, scale, width, height));

            if let Some(event) = tracker.observe(down, pos) {
                match state.apply(event) {
                    Transition::Redraw => dirty = true,
                    Transition::Released { begin, end: last } => {
                        debug!("Selection released: {begin:?} -> {last:?}");
                        end = OverlayEnd::Released { begin, end: last };
                        break;
                    }
                    Transition::Ignored => {}
                }
            }

            if dirty {
                frame.compose(state.current(), &self.style);
                window.update_with_buffer(frame.buffer(), width as usize, height as usize)?;
                dirty = false;
            } else {
                window.update();
            }
        }

        drop(window);
        Ok((self.image, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> CapturedImage {
        let img = RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        CapturedImage::new(img, (0, 0))
    }

    fn at(frame: &Frame, x: usize, y: usize) -> u32 {
        frame.buffer()[y * frame.width + x]
    }

    #[test]
    fn no_selection_dims_everything() {
        let mut frame = Frame::new(&solid(20, 10, [255, 255, 255]));
        frame.compose(None, &OverlayStyle::default());
        // 255 * 155 / 255
        assert!(frame.buffer().iter().all(|&p| p == 0x9B9B9B));
    }

    #[test]
    fn selection_is_clear_and_bordered() {
        let mut frame = Frame::new(&solid(40, 40, [200, 100, 50]));
        let rect = Rect { x1: 10, y1: 10, x2: 30, y2: 30 };
        frame.compose(Some(rect), &OverlayStyle::default());

        assert_eq!(at(&frame, 20, 20), 0xC86432);
        assert_eq!(at(&frame, 2, 2), (121 << 16) | (60 << 8) | 30);
        // border straddles the left and top edges
        assert_eq!(at(&frame, 9, 20), 0xFF0000);
        assert_eq!(at(&frame, 10, 20), 0xFF0000);
        assert_eq!(at(&frame, 11, 20), 0xC86432);
        assert_eq!(at(&frame, 20, 9), 0xFF0000);
        assert_eq!(at(&frame, 29, 20), 0xFF0000);
        assert_eq!(at(&frame, 30, 20), 0xFF0000);
        assert_eq!(at(&frame, 31, 20), (121 << 16) | (60 << 8) | 30);
    }

    #[test]
    fn shrinking_selection_is_redrawn_from_scratch() {
        let style = OverlayStyle::default();
        let mut frame = Frame::new(&solid(50, 50, [255, 255, 255]));
        frame.compose(Some(Rect { x1: 0, y1: 0, x2: 40, y2: 40 }), &style);
        frame.compose(Some(Rect { x1: 0, y1: 0, x2: 10, y2: 10 }), &style);
        assert_eq!(at(&frame, 30, 30), 0x9B9B9B);
        assert_eq!(at(&frame, 5, 5), 0xFFFFFF);
    }

    #[test]
    fn border_at_surface_edge_is_clipped() {
        let mut frame = Frame::new(&solid(20, 20, [0, 0, 0]));
        frame.compose(Some(Rect { x1: 0, y1: 0, x2: 20, y2: 20 }), &OverlayStyle::default());
        assert_eq!(at(&frame, 0, 5), 0xFF0000);
        assert_eq!(at(&frame, 19, 5), 0xFF0000);
        assert_eq!(at(&frame, 5, 5), 0);
    }

    #[test]
    fn fresh_press_draws_a_small_border_box() {
        let dim = 0x9B9B9B;
        let style = OverlayStyle::default();
        let mut frame = Frame::new(&solid(20, 20, [255, 255, 255]));

        frame.compose(Some(Rect { x1: 5, y1: 5, x2: 5, y2: 5 }), &style);
        for (x, y) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert_eq!(at(&frame, x, y), 0xFF0000, "({x}, {y})");
        }
        assert_eq!(at(&frame, 3, 5), dim);
        assert_eq!(at(&frame, 6, 5), dim);
        assert_eq!(at(&frame, 5, 6), dim);

        frame.compose(Some(Rect { x1: 0, y1: 0, x2: 0, y2: 0 }), &style);
        assert_eq!(at(&frame, 0, 0), 0xFF0000);
        assert_eq!(at(&frame, 1, 1), dim);

        frame.compose(Some(Rect { x1: 20, y1: 20, x2: 20, y2: 20 }), &style);
        assert_eq!(at(&frame, 19, 19), 0xFF0000);
        assert_eq!(at(&frame, 18, 18), dim);
    }

    #[test]
    fn window_is_sized_in_desktop_units() {
        let retina = solid(2880, 1800, [0, 0, 0]).with_scale(2.0);
        assert_eq!(window_size(&retina), (1440, 900));
        assert_eq!(window_size(&solid(1920, 1080, [0, 0, 0])), (1920, 1080));
    }

    #[test]
    fn composing_same_state_is_idempotent() {
        let mut img = RgbaImage::new(64, 48);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgba([(x * 4) as u8, (y * 5) as u8, (x ^ y) as u8, 255]);
        }
        let mut frame = Frame::new(&CapturedImage::new(img, (-1920, 0)));
        let style = OverlayStyle::default();
        let rect = Some(Rect { x1: 7, y1: 3, x2: 50, y2: 31 });

        frame.compose(rect, &style);
        let first = frame.buffer().to_vec();
        frame.compose(rect, &style);
        assert_eq!(first, frame.buffer());
    }
}
