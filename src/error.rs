use thiserror::Error;

use crate::buffer::ShxBufReaderError;

/// Everything that can go wrong parsing a font or executing a glyph stream.
///
/// Parser errors abort font construction; interpreter errors abort the
/// render call in progress. None are recoverable inside the crate — a host
/// that wants partial results should catch the error and use whatever the
/// sink already received.
#[derive(Error, Debug)]
pub enum ShxError {
    /// The header line was missing a token, or `type` was not one of
    /// `shapes`, `bigfont`, `unifont`.
    #[error("unsupported font format: {0}")]
    UnsupportedFormat(String),

    /// A read requested more bytes than the stream had left — covers the
    /// header, directory, glyph bodies, and mid-opcode operand reads alike.
    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    /// DRAW_SUBSHAPE referenced a code point absent from the glyph table.
    #[error("glyph {glyph:#06x} draws unknown sub-shape {sub_shape:#06x}")]
    UnknownSubShape { glyph: u16, sub_shape: u16 },

    /// PUSH_STACK would have grown the position stack past its capacity.
    #[error("position stack overflow in glyph {glyph:#06x} (capacity {capacity})")]
    StackOverflow { glyph: u16, capacity: usize },

    /// POP_STACK was executed against an empty position stack.
    #[error("position stack underflow in glyph {glyph:#06x}")]
    StackUnderflow { glyph: u16 },

    /// A glyph's byte stream ran out before an END_OF_SHAPE opcode appeared.
    #[error("glyph {glyph:#06x} ended before its END_OF_SHAPE opcode")]
    MalformedGlyph { glyph: u16 },

    /// Sub-shape inlining recursed past the configured depth limit.
    #[error("glyph {glyph:#06x} exceeded the sub-shape recursion limit of {limit}")]
    RecursionLimit { glyph: u16, limit: usize },
}

impl From<ShxBufReaderError> for ShxError {
    fn from(err: ShxBufReaderError) -> Self {
        ShxError::TruncatedStream(err.to_string())
    }
}
