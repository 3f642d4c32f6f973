//! Container parsers for the three SHX directory layouts.
//!
//! Each submodule reads one on-disk layout and produces a [`ParsedContainer`]
//! — the font-level metadata plus the glyph table — leaving every glyph body
//! unparsed until it is actually rendered.

use std::collections::HashMap;
use std::io::{Read, Seek};

use log::debug;

use crate::buffer::ShxBufReader;
use crate::error::ShxError;

pub mod bigfont;
pub mod shapes;
pub mod unifont;

/// A glyph's code point, promoted to `u16` for all three container kinds
/// (Shapes and BigFont code points are a single byte on disk).
pub type GlyphTable = HashMap<u16, Box<[u8]>>;

/// Which of the three directory layouts a font file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Shapes,
    BigFont,
    UniFont,
}

impl FontKind {
    fn from_header_token(token: &str) -> Option<Self> {
        match token {
            "shapes" => Some(Self::Shapes),
            "bigfont" => Some(Self::BigFont),
            "unifont" => Some(Self::UniFont),
            _ => None,
        }
    }
}

/// Font-level metadata and the glyph table, as read from any container.
#[derive(Debug)]
pub struct ParsedContainer {
    pub font_name: String,
    pub above: u8,
    pub below: u8,
    pub modes: u8,
    pub encoding: u8,
    pub embedded: u8,
    pub glyphs: GlyphTable,
    /// BigFont's code-range remapping table — parsed but never applied by
    /// the interpreter (see design note on `changes`).
    pub code_ranges: Vec<(u16, u16)>,
}

/// The three header tokens: `<format> <type> <version>`.
#[derive(Debug)]
pub struct Header {
    pub format: String,
    pub kind: FontKind,
    pub version: String,
}

/// Reads the signature line and the two terminator bytes that follow it.
pub fn parse_header<R: Read + Seek>(reader: &mut ShxBufReader<R>) -> Result<Header, ShxError> {
    let line = reader.read_terminated_string()?;
    let mut parts = line.split(' ');
    let format = parts
        .next()
        .ok_or_else(|| ShxError::UnsupportedFormat(line.clone()))?
        .to_string();
    let kind_token = parts
        .next()
        .ok_or_else(|| ShxError::UnsupportedFormat(line.clone()))?;
    let version = parts
        .next()
        .ok_or_else(|| ShxError::UnsupportedFormat(line.clone()))?
        .to_string();

    let kind = FontKind::from_header_token(kind_token)
        .ok_or_else(|| ShxError::UnsupportedFormat(line.clone()))?;

    let mut terminator = [0u8; 2];
    reader.read_exact(&mut terminator)?;

    debug!("parsed header: format={format} type={kind_token} version={version}");

    Ok(Header {
        format,
        kind,
        version,
    })
}
