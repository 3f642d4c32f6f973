use std::io::{Cursor, Read, Seek};

use log::{debug, trace};

use crate::buffer::ShxBufReader;
use crate::error::ShxError;

use super::ParsedContainer;

/// Parses the fixed-width `shapes` container that follows the header.
///
/// The index-0 directory entry is the font descriptor (name, above, below,
/// modes); every other entry is a glyph's opcode stream. Shapes carries no
/// absolute offsets, only lengths, so the descriptor's own recorded length
/// is used as the boundary for its fields — this tolerates the stray
/// trailing `u16` some shapes files carry after `modes` (see design notes).
pub fn parse<R: Read + Seek>(reader: &mut ShxBufReader<R>) -> Result<ParsedContainer, ShxError> {
    let start = reader.read_u16()?;
    let end = reader.read_u16()?;
    let count = reader.read_u16()?;
    debug!("parsing shapes container: start={start} end={end} count={count}");

    let mut directory = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = reader.read_u16()?;
        let length = reader.read_u16()?;
        directory.push((index, length));
    }

    let mut font_name = String::new();
    let mut above = 0u8;
    let mut below = 0u8;
    let mut modes = 0u8;
    let mut glyphs = super::GlyphTable::new();

    for (index, length) in directory {
        let body = reader.read_bytes(length as usize)?;
        if index == 0 {
            let (name, rest) = read_descriptor_name(&body);
            font_name = name;
            let mut cursor = Cursor::new(rest);
            above = read_u8_or_zero(&mut cursor);
            below = read_u8_or_zero(&mut cursor);
            modes = read_u8_or_zero(&mut cursor);
            trace!("descriptor: name={font_name:?} above={above} below={below} modes={modes}");
        } else {
            trace!("glyph {index:#06x}: {} bytes", body.len());
            glyphs.insert(index, body);
        }
    }

    Ok(ParsedContainer {
        font_name,
        above,
        below,
        modes,
        encoding: 0,
        embedded: 0,
        glyphs,
        code_ranges: Vec::new(),
    })
}

fn read_descriptor_name(body: &[u8]) -> (String, &[u8]) {
    let terminator = body
        .iter()
        .position(|&b| b == 0x00 || b == b'\r' || b == b'\n');
    match terminator {
        Some(pos) => (
            String::from_utf8_lossy(&body[..pos]).into_owned(),
            &body[pos + 1..],
        ),
        None => (String::from_utf8_lossy(body).into_owned(), &[]),
    }
}

fn read_u8_or_zero(cursor: &mut Cursor<&[u8]>) -> u8 {
    let mut buf = [0u8; 1];
    match cursor.read_exact(&mut buf) {
        Ok(()) => buf[0],
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn directory_bytes(entries: &[(u16, u16)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (index, length) in entries {
            out.extend_from_slice(&index.to_le_bytes());
            out.extend_from_slice(&length.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_descriptor_and_one_glyph() {
        let mut body = Vec::new();
        body.extend_from_slice(b"TestFont\x00");
        body.push(6); // above
        body.push(2); // below
        body.push(0); // modes
        let descriptor_len = body.len() as u16;

        let glyph_body = vec![0x14u8, 0x00];

        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes()); // start
        data.extend_from_slice(&1u16.to_le_bytes()); // end
        data.extend_from_slice(&2u16.to_le_bytes()); // count
        data.extend_from_slice(&directory_bytes(&[
            (0, descriptor_len),
            (0x41, glyph_body.len() as u16),
        ]));
        data.extend_from_slice(&body);
        data.extend_from_slice(&glyph_body);

        let mut reader = ShxBufReader::from_buffer(IoCursor::new(data));
        let parsed = parse(&mut reader).unwrap();

        assert_eq!(parsed.font_name, "TestFont");
        assert_eq!(parsed.above, 6);
        assert_eq!(parsed.below, 2);
        assert_eq!(parsed.modes, 0);
        assert_eq!(parsed.glyphs.len(), 1);
        assert_eq!(&*parsed.glyphs[&0x41], glyph_body.as_slice());
        assert!(!parsed.glyphs.contains_key(&0));
    }

    #[test]
    fn tolerates_trailing_bytes_after_modes() {
        // Descriptor body carries two extra bytes after modes (the stray
        // trailing u16 noted in the design notes).
        let mut body = Vec::new();
        body.extend_from_slice(b"X\x00");
        body.push(9);
        body.push(1);
        body.push(0);
        body.extend_from_slice(&[0xAA, 0xBB]);
        let descriptor_len = body.len() as u16;

        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&directory_bytes(&[(0, descriptor_len)]));
        data.extend_from_slice(&body);

        let mut reader = ShxBufReader::from_buffer(IoCursor::new(data));
        let parsed = parse(&mut reader).unwrap();
        assert_eq!(parsed.font_name, "X");
        assert_eq!(parsed.above, 9);
        assert_eq!(parsed.below, 1);
    }
}
