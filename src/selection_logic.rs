// src/selection_logic.rs
// Pure selection state, no window dependency.

/// Selections narrower or shorter than this are treated as accidental clicks.
pub const MIN_SELECTION_SIZE: u32 = 10;

/// 选区坐标（覆盖层内的像素位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Point { x, y }
    }

    /// Converts a pointer position in window units into a pixel of a `width` x `height` image.
    /// `scale` is the number of image pixels per window unit.
    pub fn from_pointer(x: f32, y: f32, scale: f64, width: u32, height: u32) -> Self {
        let clamp = |v: f32, max: u32| -> u32 {
            let v = v as f64 * scale;
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v.floor() as u32).min(max)
            }
        };
        Point::new(clamp(x, width), clamp(y, height))
    }
}

/// 矩形选区结构体，覆盖像素 `[x1, x2) x [y1, y2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub fn from_points(a: Point, b: Point) -> Self {
        Rect {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// What the extractor decided about a finished drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Accepted(Rect),
    TooSmall { width: u32, height: u32 },
}

/// Turns the two endpoints of a drag into a crop rectangle, or rejects it.
pub fn extract(begin: Point, end: Point) -> Extraction {
    let rect = Rect::from_points(begin, end);
    let (width, height) = (rect.width(), rect.height());
    if width < MIN_SELECTION_SIZE || height < MIN_SELECTION_SIZE {
        Extraction::TooSmall { width, height }
    } else {
        Extraction::Accepted(rect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press(Point),
    Move(Point),
    Release(Point),
}

/// Result of feeding one event into a [`SelectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Redraw,
    Released { begin: Point, end: Point },
}

/// 单次选区会话的拖拽状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub begin: Option<Point>,
    pub end: Option<Point>,
    pub active: bool,
    finished: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rectangle to highlight, once a press has happened.
    pub fn current(&self) -> Option<Rect> {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => Some(Rect::from_points(b, e)),
            _ => None,
        }
    }

    pub fn apply(&mut self, event: PointerEvent) -> Transition {
        if self.finished {
            return Transition::Ignored;
        }
        match event {
            PointerEvent::Press(pos) => {
                self.begin = Some(pos);
                self.end = Some(pos);
                self.active = true;
                Transition::Redraw
            }
            PointerEvent::Move(pos) if self.active => {
                if self.end == Some(pos) {
                    return Transition::Ignored;
                }
                self.end = Some(pos);
                Transition::Redraw
            }
            PointerEvent::Move(_) => Transition::Ignored,
            PointerEvent::Release(pos) => {
                let Some(begin) = self.begin.filter(|_| self.active) else {
                    return Transition::Ignored;
                };
                self.end = Some(pos);
                self.active = false;
                self.finished = true;
                Transition::Released { begin, end: pos }
            }
        }
    }
}

/// 每帧采样鼠标状态，转换为按下/移动/松开事件
#[derive(Debug, Default)]
pub struct PointerTracker {
    was_down: bool,
    last: Option<Point>,
}

impl PointerTracker {
    pub fn observe(&mut self, down: bool, pos: Option<Point>) -> Option<PointerEvent> {
        let pos = pos.or(self.last);
        let event = match (self.was_down, down, pos) {
            (false, true, Some(p)) => Some(PointerEvent::Press(p)),
            (true, true, Some(p)) if Some(p) != self.last => Some(PointerEvent::Move(p)),
            (true, false, Some(p)) => Some(PointerEvent::Release(p)),
            _ => None,
        };
        // a press without a known position is retried next frame
        if !(down && !self.was_down && pos.is_none()) {
            self.was_down = down;
        }
        self.last = pos;
        event
    }
}
