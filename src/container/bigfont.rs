use std::io::{Read, Seek};

use log::{debug, trace};

use crate::buffer::ShxBufReader;
use crate::error::ShxError;

use super::ParsedContainer;

/// Parses the `bigfont` container: absolute offsets per glyph, plus a
/// code-range remapping table that the interpreter never applies itself.
pub fn parse<R: Read + Seek>(reader: &mut ShxBufReader<R>) -> Result<ParsedContainer, ShxError> {
    let count = reader.read_u16()?;
    let _length = reader.read_u16()?; // reserved, unused
    let change_count = reader.read_u16()?;
    debug!("parsing bigfont container: count={count} change_count={change_count}");

    let mut code_ranges = Vec::with_capacity(change_count as usize);
    for _ in 0..change_count {
        let range_start = reader.read_u16()?;
        let range_end = reader.read_u16()?;
        code_ranges.push((range_start, range_end));
    }

    let mut directory = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = reader.read_u16()?;
        let length = reader.read_u16()?;
        let offset = reader.read_u32()?;
        directory.push((index, length, offset));
    }

    let mut above = 0u8;
    let mut below = 0u8;
    let mut modes = 0u8;
    let mut glyphs = super::GlyphTable::new();

    for (index, length, offset) in directory {
        reader.seek_to(offset as u64)?;
        if index == 0 {
            above = reader.read_u8()?;
            below = reader.read_u8()?;
            modes = reader.read_u8()?;
            trace!("descriptor: above={above} below={below} modes={modes}");
        } else {
            // The leading byte of a bigfont glyph body is a framing byte
            // AutoCAD writes and never passes to the interpreter.
            let body = reader.read_bytes(length as usize)?;
            let stripped: Box<[u8]> = body.get(1..).unwrap_or(&[]).into();
            trace!("glyph {index:#06x}: {} bytes (stripped)", stripped.len());
            glyphs.insert(index, stripped);
        }
    }

    Ok(ParsedContainer {
        font_name: String::new(),
        above,
        below,
        modes,
        encoding: 0,
        embedded: 0,
        glyphs,
        code_ranges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn strips_leading_framing_byte_and_applies_offsets() {
        let mut data = Vec::new();
        // header fields
        data.extend_from_slice(&2u16.to_le_bytes()); // count
        data.extend_from_slice(&0u16.to_le_bytes()); // length (reserved)
        data.extend_from_slice(&1u16.to_le_bytes()); // change_count
        data.extend_from_slice(&0x30u16.to_le_bytes()); // change start
        data.extend_from_slice(&0x39u16.to_le_bytes()); // change end

        // directory: index 0 descriptor at offset X, index 0x41 glyph at offset Y
        let descriptor_offset: u32 = 200;
        let glyph_offset: u32 = 300;
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&descriptor_offset.to_le_bytes());
        data.extend_from_slice(&0x41u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&glyph_offset.to_le_bytes());

        data.resize(descriptor_offset as usize, 0);
        data.extend_from_slice(&[7, 2, 0]); // above, below, modes

        data.resize(glyph_offset as usize, 0);
        data.extend_from_slice(&[0xFF, 0x14, 0x00]); // framing byte + real opcode stream

        let mut reader = ShxBufReader::from_buffer(Cursor::new(data));
        let parsed = parse(&mut reader).unwrap();

        assert_eq!(parsed.above, 7);
        assert_eq!(parsed.below, 2);
        assert_eq!(parsed.code_ranges, vec![(0x30, 0x39)]);
        assert_eq!(&*parsed.glyphs[&0x41], &[0x14, 0x00][..]);
    }
}
