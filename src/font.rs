//! The parsed, immutable font and its public render entry point.

use std::io::{Read, Seek};

use log::debug;

use crate::buffer::ShxBufReader;
use crate::container::{self, FontKind, GlyphTable};
use crate::error::ShxError;
use crate::interp::Interpreter;
use crate::sink::ShapeSink;

/// How a render call should treat the font: which direction it draws in,
/// and at what point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Governs `COND_MODE_2`: only fires when the font is in dual mode
    /// (`modes == 2`) *and* this is `true`.
    pub horizontal: bool,
    /// Sets the initial scale register as `font_size / above`.
    pub font_size: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            horizontal: true,
            font_size: 12.0,
        }
    }
}

/// A fully parsed SHX font: immutable metadata plus a lazily-interpreted
/// glyph table. Safe to share across concurrent renders — each render owns
/// its own interpreter state and its own sink.
#[derive(Debug)]
pub struct Font {
    pub format: String,
    pub kind: FontKind,
    pub version: String,
    pub font_name: String,
    pub above: u8,
    pub below: u8,
    pub modes: u8,
    pub encoding: u8,
    pub embedded: u8,
    pub code_ranges: Vec<(u16, u16)>,
    pub(crate) glyphs: GlyphTable,
}

impl Font {
    /// Parses a font from any `Read + Seek` byte source. Unifont and
    /// bigfont require absolute seeking; shapes is read sequentially.
    pub fn parse<R: Read + Seek>(source: R) -> Result<Self, ShxError> {
        let mut reader = ShxBufReader::from_buffer(source);
        let header = container::parse_header(&mut reader)?;

        let parsed = match header.kind {
            FontKind::Shapes => container::shapes::parse(&mut reader)?,
            FontKind::BigFont => container::bigfont::parse(&mut reader)?,
            FontKind::UniFont => container::unifont::parse(&mut reader)?,
        };

        debug!(
            "parsed font: format={} kind={:?} version={} glyphs={}",
            header.format,
            header.kind,
            header.version,
            parsed.glyphs.len()
        );

        Ok(Self {
            format: header.format,
            kind: header.kind,
            version: header.version,
            font_name: parsed.font_name,
            above: parsed.above,
            below: parsed.below,
            modes: parsed.modes,
            encoding: parsed.encoding,
            embedded: parsed.embedded,
            code_ranges: parsed.code_ranges,
            glyphs: parsed.glyphs,
        })
    }

    /// Renders `text` into `sink`, one glyph at a time. Characters absent
    /// from the glyph table are silently skipped. Position, scale, and the
    /// position stack persist across characters within this one call.
    pub fn render<S: ShapeSink>(
        &self,
        sink: &mut S,
        text: &str,
        options: RenderOptions,
    ) -> Result<(), ShxError> {
        let mut interpreter = Interpreter::new(self, options);
        for ch in text.chars() {
            let Ok(code_point) = u16::try_from(ch as u32) else {
                continue;
            };
            if !self.glyphs.contains_key(&code_point) {
                continue;
            }
            interpreter.run_glyph(code_point, sink)?;
        }
        Ok(())
    }
}
