use std::io::{self, BufReader, Read, Seek, SeekFrom};

use thiserror::Error;

/// Errors raised while positioning or reading the underlying byte stream.
#[derive(Error, Debug)]
pub enum ShxBufReaderError {
    /// A read asked for more bytes than the stream had left.
    #[error("unexpected end of stream: requested {requested} bytes, got {available}")]
    UnexpectedEnd { requested: usize, available: usize },

    /// A seek failed (stream not actually seekable, or a bad offset).
    #[error("failed to seek: {0}")]
    FailedToSeek(io::Error),

    /// Any other I/O failure from the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),
}

macro_rules! impl_read_le {
    ($fn_name:ident, $typ:ty) => {
        pub fn $fn_name(&mut self) -> Result<$typ, ShxBufReaderError> {
            let mut buf = [0u8; size_of::<$typ>()];
            self.read_exact(&mut buf)?;
            Ok(<$typ>::from_le_bytes(buf))
        }
    };
}

/// A positioned little-endian reader over any `Read + Seek` byte source.
///
/// SHX directories require absolute seeking (bigfont, unifont); the shapes
/// container is read sequentially. One reader serves all three.
#[derive(Debug)]
pub struct ShxBufReader<B: Read + Seek> {
    inner: BufReader<B>,
}

impl<B> ShxBufReader<B>
where
    B: Read + Seek,
{
    pub fn from_buffer(buffer: B) -> Self {
        Self {
            inner: BufReader::new(buffer),
        }
    }

    /// Seeks to an absolute byte offset from the start of the stream.
    pub fn seek_to(&mut self, pos: u64) -> Result<(), ShxBufReaderError> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .map_err(ShxBufReaderError::FailedToSeek)?;
        Ok(())
    }

    /// Seeks by `n` bytes relative to the current position.
    pub fn skip(&mut self, n: i64) -> Result<(), ShxBufReaderError> {
        self.inner
            .seek(SeekFrom::Current(n))
            .map_err(ShxBufReaderError::FailedToSeek)?;
        Ok(())
    }

    /// Returns the current absolute byte offset.
    pub fn position(&mut self) -> Result<u64, ShxBufReaderError> {
        self.inner
            .stream_position()
            .map_err(ShxBufReaderError::FailedToSeek)
    }

    /// Reads exactly `buffer.len()` bytes, reporting how many were actually
    /// available when the stream runs dry early.
    pub fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), ShxBufReaderError> {
        let requested = buffer.len();
        let mut filled = 0;
        while filled < requested {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => {
                    return Err(ShxBufReaderError::UnexpectedEnd {
                        requested,
                        available: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Reads `len` bytes and returns them as an owned, boxed slice — the
    /// representation used for a glyph's opcode stream.
    pub fn read_bytes(&mut self, len: usize) -> Result<Box<[u8]>, ShxBufReaderError> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }

    impl_read_le!(read_u16, u16);
    impl_read_le!(read_u32, u32);

    pub fn read_u8(&mut self) -> Result<u8, ShxBufReaderError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads an ASCII string terminated by the first of NUL, CR, LF, or EOF.
    /// The terminator itself is consumed but not included in the result.
    pub fn read_terminated_string(&mut self) -> Result<String, ShxBufReaderError> {
        let mut bytes = Vec::new();
        loop {
            let mut b = [0u8; 1];
            match self.inner.read(&mut b) {
                Ok(0) => break,
                Ok(_) => match b[0] {
                    0x00 | b'\r' | b'\n' => break,
                    other => bytes.push(other),
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
