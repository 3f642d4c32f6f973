//! The geometric sink consumed by the opcode interpreter.
//!
//! The interpreter is agnostic to how primitives are eventually drawn —
//! curve flattening, rasterization, and text layout across glyphs are all
//! the host's concern. Any type implementing [`ShapeSink`] can receive the
//! emitted `move`/`line`/`arc` calls.

/// Receives drawing primitives in the exact order the interpreter executes
/// them. Coordinates are floats in the same units as the render call's
/// `font_size`.
pub trait ShapeSink {
    /// The current figure ends; subsequent `move`/`line`/`arc` calls start a
    /// new one. Calling this twice in a row is equivalent to calling it once.
    fn new_path(&mut self);

    /// Sets the current point without stroking anything.
    fn move_to(&mut self, x: f64, y: f64);

    /// Strokes a straight line from `(x0, y0)` to `(x1, y1)`.
    fn line_to(&mut self, x0: f64, y0: f64, x1: f64, y1: f64);

    /// Strokes a circular arc from `(x0, y0)` to `(x1, y1)` passing through
    /// the midpoint `(cx, cy)`. `(x0, y0) == (x1, y1)` is a full circle with
    /// `(cx, cy)` on its far side.
    fn arc_to(&mut self, x0: f64, y0: f64, cx: f64, cy: f64, x1: f64, y1: f64);
}

/// A segment recorded by [`RecordingSink`], named after the sink call that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum PathEvent {
    NewPath,
    Move { x: f64, y: f64 },
    Line { x0: f64, y0: f64, x1: f64, y1: f64 },
    Arc {
        x0: f64,
        y0: f64,
        cx: f64,
        cy: f64,
        x1: f64,
        y1: f64,
    },
}

/// A reference sink that records every call verbatim — useful for tests and
/// as a minimal example of the sink contract.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<PathEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShapeSink for RecordingSink {
    fn new_path(&mut self) {
        if !matches!(self.events.last(), Some(PathEvent::NewPath)) {
            self.events.push(PathEvent::NewPath);
        }
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.events.push(PathEvent::Move { x, y });
    }

    fn line_to(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.events.push(PathEvent::Line { x0, y0, x1, y1 });
    }

    fn arc_to(&mut self, x0: f64, y0: f64, cx: f64, cy: f64, x1: f64, y1: f64) {
        self.events.push(PathEvent::Arc {
            x0,
            y0,
            cx,
            cy,
            x1,
            y1,
        });
    }
}
