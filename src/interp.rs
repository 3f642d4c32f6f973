//! The opcode interpreter: a small stack-based virtual machine that walks a
//! glyph's byte stream and emits `move`/`line`/`arc` primitives to a sink.
//!
//! This is the core of the crate. Every opcode, its sign conventions, and
//! its interaction with the `skip` one-shot flag must match exactly —
//! getting geometry bit-identical to AutoCAD depends on the state-mutation
//! order here, not just the final formulas.

use std::f64::consts::{FRAC_PI_2, TAU};

use log::trace;

use crate::container::FontKind;
use crate::error::ShxError;
use crate::font::{Font, RenderOptions};
use crate::sink::ShapeSink;

/// Position stack capacity; a fifth `PUSH_STACK` without an intervening pop
/// is a `StackOverflow`.
const STACK_CAPACITY: usize = 4;

/// Sub-shape inlining depth limit (design note: the reference implementation
/// imposes none; we cap to keep pathological fonts from recursing forever).
const RECURSION_LIMIT: usize = 16;

/// One entry in the sub-shape call stack: a borrowed glyph byte slice plus
/// the cursor's current read position within it.
struct Frame<'f> {
    glyph: u16,
    code: &'f [u8],
    pos: usize,
}

/// Compass table for length-encoded vector moves, indexed by the opcode's
/// low nibble. Values are unit displacements in `{-1, -0.5, 0, 0.5, 1}`.
const COMPASS: [(f64, f64); 16] = [
    (1.0, 0.0),
    (1.0, 0.5),
    (1.0, 1.0),
    (0.5, 1.0),
    (0.0, 1.0),
    (-0.5, 1.0),
    (-1.0, 1.0),
    (-1.0, 0.5),
    (-1.0, 0.0),
    (-1.0, -0.5),
    (-1.0, -1.0),
    (-0.5, -1.0),
    (0.0, -1.0),
    (0.5, -1.0),
    (1.0, -1.0),
    (1.0, -0.5),
];

/// Decodes the `sc` byte shared by OCTANT_ARC and FRACTIONAL_ARC into
/// `(ccw, s, c)`: starting octant `s` (negated when counter-clockwise) and
/// octant span `c` (0 is read as a full 8-octant sweep).
fn decode_octant_sc(sc_raw: u8) -> (bool, i32, i32) {
    let ccw = (sc_raw >> 7) & 1 == 1;
    let mut s = ((sc_raw >> 4) & 0x7) as i32;
    let mut c = (sc_raw & 0x7) as i32;
    if c == 0 {
        c = 8;
    }
    if ccw {
        s = -s;
    }
    (ccw, s, c)
}

/// Per-render mutable state, scoped to one `Font::render` call. Constructed
/// once per render and reused across every character in the text, so
/// position, scale, and the position stack all persist between glyphs.
pub(crate) struct Interpreter<'f> {
    font: &'f Font,
    horizontal: bool,
    x: f64,
    y: f64,
    last_x: f64,
    last_y: f64,
    scale: f64,
    pen: bool,
    stack: Vec<(f64, f64)>,
    skip: bool,
    frames: Vec<Frame<'f>>,
}

impl<'f> Interpreter<'f> {
    pub(crate) fn new(font: &'f Font, options: RenderOptions) -> Self {
        Self {
            font,
            horizontal: options.horizontal,
            x: 0.0,
            y: 0.0,
            last_x: 0.0,
            last_y: 0.0,
            scale: options.font_size / font.above as f64,
            pen: false,
            stack: Vec::with_capacity(STACK_CAPACITY),
            skip: false,
            frames: Vec::new(),
        }
    }

    /// Executes one glyph's opcode stream to its END_OF_SHAPE, in the style
    /// of a per-letter boundary: pen starts down, `skip` starts disarmed.
    pub(crate) fn run_glyph<S: ShapeSink>(
        &mut self,
        code_point: u16,
        sink: &mut S,
    ) -> Result<(), ShxError> {
        let code: &'f [u8] = &self.font.glyphs[&code_point];
        self.pen = true;
        self.skip = false;
        self.frames.clear();
        self.frames.push(Frame {
            glyph: code_point,
            code,
            pos: 0,
        });
        while !self.frames.is_empty() {
            self.step(sink)?;
        }
        Ok(())
    }

    fn current_glyph(&self) -> u16 {
        self.frames.last().map(|f| f.glyph).unwrap_or(0)
    }

    /// Reads the next opcode byte. Running out here (no END_OF_SHAPE seen)
    /// is a malformed glyph, not a truncated-operand condition.
    fn next_opcode_byte(&mut self) -> Result<u8, ShxError> {
        let glyph = self.current_glyph();
        let frame = self
            .frames
            .last_mut()
            .expect("frame stack is non-empty while stepping");
        match frame.code.get(frame.pos).copied() {
            Some(b) => {
                frame.pos += 1;
                Ok(b)
            }
            None => Err(ShxError::MalformedGlyph { glyph }),
        }
    }

    /// Reads an operand byte belonging to the opcode currently dispatching.
    /// Operand bytes are always consumed, `skip` or not (parse-position
    /// invariance) — only their effect is suppressed.
    fn next_operand_byte(&mut self) -> Result<u8, ShxError> {
        let glyph = self.current_glyph();
        let frame = self
            .frames
            .last_mut()
            .expect("frame stack is non-empty while stepping");
        match frame.code.get(frame.pos).copied() {
            Some(b) => {
                frame.pos += 1;
                Ok(b)
            }
            None => Err(ShxError::TruncatedStream(format!(
                "glyph {glyph:#06x}: opcode operand ran past the end of its stream"
            ))),
        }
    }

    fn emit_move_or_line<S: ShapeSink>(&mut self, sink: &mut S) {
        if self.pen {
            sink.line_to(self.last_x, self.last_y, self.x, self.y);
        } else {
            sink.move_to(self.x, self.y);
        }
        self.last_x = self.x;
        self.last_y = self.y;
    }

    fn step<S: ShapeSink>(&mut self, sink: &mut S) -> Result<(), ShxError> {
        let b = self.next_opcode_byte()?;
        let direction = b & 0x0F;
        let length = (b >> 4) & 0x0F;

        // Centralized arm/disarm: whatever opcode follows a COND_MODE_2
        // that armed `skip` inherits the suppression, then clears it.
        let suppressed = self.skip;
        self.skip = false;

        if length != 0 {
            trace!("vector move dir={direction} len={length} suppressed={suppressed}");
            self.vector_move(direction, length, suppressed, sink);
            return Ok(());
        }

        trace!("special opcode {direction:#03x} suppressed={suppressed}");
        match direction {
            0x0 => self.end_of_shape(suppressed, sink),
            0x1 => self.pen_down(suppressed, sink),
            0x2 => self.pen_up(suppressed),
            0x3 => self.divide_vector(suppressed),
            0x4 => self.multiply_vector(suppressed),
            0x5 => self.push_stack(suppressed),
            0x6 => self.pop_stack(suppressed, sink),
            0x7 => self.draw_subshape(suppressed),
            0x8 => self.xy_displacement(suppressed, sink),
            0x9 => self.poly_xy_displacement(suppressed, sink),
            0xA => self.octant_arc(suppressed, sink),
            0xB => self.fractional_arc(suppressed, sink),
            0xC => self.bulge_arc(suppressed, sink),
            0xD => self.poly_bulge_arc(suppressed, sink),
            0xE => Ok(self.cond_mode_2(suppressed)),
            _ => unreachable!("direction is a 4-bit nibble"),
        }
    }

    fn vector_move<S: ShapeSink>(&mut self, direction: u8, length: u8, suppressed: bool, sink: &mut S) {
        if suppressed {
            return;
        }
        let (dx, dy) = COMPASS[direction as usize];
        self.x += dx * length as f64 * self.scale;
        self.y += dy * length as f64 * self.scale;
        self.emit_move_or_line(sink);
    }

    fn end_of_shape<S: ShapeSink>(&mut self, _suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        // Unlike every other special opcode, END_OF_SHAPE is not subject to
        // `skip` — it always closes the current figure.
        self.frames.pop();
        sink.new_path();
        Ok(())
    }

    fn pen_down<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        if !suppressed {
            self.pen = true;
            sink.move_to(self.x, self.y);
        }
        Ok(())
    }

    fn pen_up(&mut self, suppressed: bool) -> Result<(), ShxError> {
        if !suppressed {
            self.pen = false;
        }
        Ok(())
    }

    fn divide_vector(&mut self, suppressed: bool) -> Result<(), ShxError> {
        let factor = self.next_operand_byte()?;
        if !suppressed {
            self.scale /= factor as f64;
        }
        Ok(())
    }

    fn multiply_vector(&mut self, suppressed: bool) -> Result<(), ShxError> {
        let factor = self.next_operand_byte()?;
        if !suppressed {
            self.scale *= factor as f64;
        }
        Ok(())
    }

    fn push_stack(&mut self, suppressed: bool) -> Result<(), ShxError> {
        if suppressed {
            return Ok(());
        }
        if self.stack.len() >= STACK_CAPACITY {
            let glyph = self.current_glyph();
            return Err(ShxError::StackOverflow {
                glyph,
                capacity: STACK_CAPACITY,
            });
        }
        self.stack.push((self.x, self.y));
        Ok(())
    }

    fn pop_stack<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        if suppressed {
            return Ok(());
        }
        let glyph = self.current_glyph();
        let (x, y) = self
            .stack
            .pop()
            .ok_or(ShxError::StackUnderflow { glyph })?;
        self.x = x;
        self.y = y;
        sink.move_to(x, y);
        self.last_x = x;
        self.last_y = y;
        Ok(())
    }

    fn draw_subshape(&mut self, suppressed: bool) -> Result<(), ShxError> {
        let sub_index = match self.font.kind {
            FontKind::Shapes => self.next_operand_byte()? as u16,
            FontKind::BigFont => {
                let first = self.next_operand_byte()?;
                if first == 0 {
                    let lo = self.next_operand_byte()?;
                    let hi = self.next_operand_byte()?;
                    let origin_x = self.next_operand_byte()? as f64 * self.scale;
                    let origin_y = self.next_operand_byte()? as f64 * self.scale;
                    let width = self.next_operand_byte()? as f64 * self.scale;
                    let height = self.next_operand_byte()? as f64 * self.scale;
                    trace!(
                        "bigfont subshape origin=({origin_x}, {origin_y}) size=({width}, {height})"
                    );
                    u16::from_le_bytes([lo, hi])
                } else {
                    first as u16
                }
            }
            FontKind::UniFont => {
                let lo = self.next_operand_byte()?;
                let hi = self.next_operand_byte()?;
                u16::from_le_bytes([lo, hi])
            }
        };

        if suppressed {
            return Ok(());
        }

        let glyph = self.current_glyph();
        if self.frames.len() >= RECURSION_LIMIT {
            return Err(ShxError::RecursionLimit {
                glyph,
                limit: RECURSION_LIMIT,
            });
        }
        let sub_code: &'f [u8] = self
            .font
            .glyphs
            .get(&sub_index)
            .ok_or(ShxError::UnknownSubShape {
                glyph,
                sub_shape: sub_index,
            })?;
        self.frames.push(Frame {
            glyph: sub_index,
            code: sub_code,
            pos: 0,
        });
        Ok(())
    }

    fn xy_displacement<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        let dx = self.next_operand_byte()? as i8 as f64;
        let dy = self.next_operand_byte()? as i8 as f64;
        if !suppressed {
            self.x += dx * self.scale;
            self.y += dy * self.scale;
            self.emit_move_or_line(sink);
        }
        Ok(())
    }

    fn poly_xy_displacement<S: ShapeSink>(
        &mut self,
        suppressed: bool,
        sink: &mut S,
    ) -> Result<(), ShxError> {
        loop {
            let dx = self.next_operand_byte()? as i8 as f64;
            let dy = self.next_operand_byte()? as i8 as f64;
            if dx == 0.0 && dy == 0.0 {
                break;
            }
            if !suppressed {
                self.x += dx * self.scale;
                self.y += dy * self.scale;
                self.emit_move_or_line(sink);
            }
        }
        Ok(())
    }

    /// Shared center/midpoint/endpoint math for OCTANT_ARC and
    /// FRACTIONAL_ARC, which differ only in how they derive the two angles.
    fn apply_arc<S: ShapeSink>(&mut self, radius: f64, start_angle: f64, end_angle: f64, sink: &mut S) {
        let mid_angle = (start_angle + end_angle) / 2.0;
        let cx = self.x - radius * start_angle.cos();
        let cy = self.y - radius * start_angle.sin();
        let mx = cx + radius * mid_angle.cos();
        let my = cy + radius * mid_angle.sin();
        self.x = cx + radius * end_angle.cos();
        self.y = cy + radius * end_angle.sin();
        if self.pen {
            sink.arc_to(self.last_x, self.last_y, mx, my, self.x, self.y);
        } else {
            sink.move_to(self.x, self.y);
        }
        self.last_x = self.x;
        self.last_y = self.y;
    }

    fn octant_arc<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        let radius_raw = self.next_operand_byte()?;
        let sc_raw = self.next_operand_byte()?;
        if suppressed {
            return Ok(());
        }
        let octant = TAU / 8.0;
        let radius = radius_raw as f64 * self.scale;
        let (_, s, c) = decode_octant_sc(sc_raw);
        let start_angle = s as f64 * octant;
        let end_angle = (c + s) as f64 * octant;
        self.apply_arc(radius, start_angle, end_angle, sink);
        Ok(())
    }

    fn fractional_arc<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        let start_offset_b = self.next_operand_byte()?;
        let end_offset_b = self.next_operand_byte()?;
        let radius_hi = self.next_operand_byte()?;
        let radius_lo = self.next_operand_byte()?;
        let sc_raw = self.next_operand_byte()?;
        if suppressed {
            return Ok(());
        }
        let octant = TAU / 8.0;
        let start_offset = octant * start_offset_b as f64 / 256.0;
        let end_offset = octant * end_offset_b as f64 / 256.0;
        let radius = (256.0 * radius_hi as f64 + radius_lo as f64) * self.scale;
        let (_, s, c) = decode_octant_sc(sc_raw);
        let start_angle = s as f64 * octant + start_offset;
        let end_angle = (c + s) as f64 * octant + end_offset;
        self.apply_arc(radius, start_angle, end_angle, sink);
        Ok(())
    }

    /// `dx`/`dy` are scaled before anything else is derived from them, so
    /// the chord midpoint and the endpoint end up in the same (rendered)
    /// units — see the BULGE_ARC design note.
    fn apply_bulge<S: ShapeSink>(&mut self, dx: f64, dy: f64, h: f64, sink: &mut S) {
        let dx = dx * self.scale;
        let dy = dy * self.scale;
        let r = (dx * dx + dy * dy).sqrt() / 2.0;
        let bulge = h / 127.0;
        let bx = self.x + dx / 2.0;
        let by = self.y + dy / 2.0;
        let bulge_angle = dy.atan2(dx) - FRAC_PI_2;
        let mx = bx + r * bulge * bulge_angle.cos();
        let my = by + r * bulge * bulge_angle.sin();
        self.x += dx;
        self.y += dy;
        if self.pen {
            if bulge == 0.0 {
                sink.line_to(self.last_x, self.last_y, self.x, self.y);
            } else {
                sink.arc_to(self.last_x, self.last_y, mx, my, self.x, self.y);
            }
        } else {
            sink.move_to(self.x, self.y);
        }
        self.last_x = self.x;
        self.last_y = self.y;
    }

    fn bulge_arc<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        let dx = self.next_operand_byte()? as i8 as f64;
        let dy = self.next_operand_byte()? as i8 as f64;
        let h = self.next_operand_byte()? as i8 as f64;
        if !suppressed {
            self.apply_bulge(dx, dy, h, sink);
        }
        Ok(())
    }

    fn poly_bulge_arc<S: ShapeSink>(&mut self, suppressed: bool, sink: &mut S) -> Result<(), ShxError> {
        loop {
            let dx = self.next_operand_byte()? as i8 as f64;
            let dy = self.next_operand_byte()? as i8 as f64;
            if dx == 0.0 && dy == 0.0 {
                break;
            }
            let h = self.next_operand_byte()? as i8 as f64;
            if !suppressed {
                self.apply_bulge(dx, dy, h, sink);
            }
        }
        Ok(())
    }

    fn cond_mode_2(&mut self, suppressed: bool) {
        if suppressed {
            return;
        }
        if self.font.modes == 2 && self.horizontal {
            self.skip = true;
        }
    }
}
