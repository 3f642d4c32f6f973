use std::io::{Read, Seek};

use log::{debug, trace};

use crate::buffer::ShxBufReader;
use crate::error::ShxError;

use super::ParsedContainer;

/// Parses the `unifont` container: 16-bit code points, with each directory
/// entry immediately followed by its own glyph body (no separate directory
/// block as in shapes/bigfont).
pub fn parse<R: Read + Seek>(reader: &mut ShxBufReader<R>) -> Result<ParsedContainer, ShxError> {
    let body_start = reader.position()?;
    let count = reader.read_u32()?;
    let _length = reader.read_u16()?; // reserved

    // Quirk preserved from the reference implementation: the descriptor
    // fields start 5 bytes into the container, one byte short of where the
    // count/length fields end.
    reader.seek_to(body_start + 5)?;

    let font_name = reader.read_terminated_string()?;
    let above = reader.read_u8()?;
    let below = reader.read_u8()?;
    let mode = reader.read_u8()?;
    let encoding = reader.read_u8()?;
    let embedded = reader.read_u8()?;
    let _ignore = reader.read_u8()?;
    debug!(
        "parsing unifont container: name={font_name:?} count={count} mode={mode} encoding={encoding}"
    );

    let mut glyphs = super::GlyphTable::new();
    let glyph_count = count.saturating_sub(1);
    for _ in 0..glyph_count {
        let index = reader.read_u16()?;
        let length = reader.read_u16()?;
        let body = reader.read_bytes(length as usize)?;
        let stripped: Box<[u8]> = body.get(1..).unwrap_or(&[]).into();
        trace!("glyph {index:#06x}: {} bytes (stripped)", stripped.len());
        glyphs.insert(index, stripped);
    }

    Ok(ParsedContainer {
        font_name,
        above,
        below,
        modes: mode,
        encoding,
        embedded,
        glyphs,
        code_ranges: Vec::new(),
    })
}
