use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum PngError {
    FileOpenFailed { path: PathBuf, source: io::Error },
    NoOpenFile,
    AlreadyOpen,
    EndOfStream,
    Io(io::Error),
    InvalidSignature,
    UnsupportedBitDepth(u8),
    UnsupportedIhdr(String),
    UnexpectedChunkLayout(String),
    CorruptedChunk { chunk: String, expected: u32, calculated: u32 },
    CorruptedFilteredStream(String),
    DecompressionFailed(String),
    Unsupported(String),
    InvalidDimensions { width: u32, height: u32 },
}

impl Error for PngError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PngError::FileOpenFailed { source, .. } => Some(source),
            PngError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for PngError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PngError::FileOpenFailed { path, source } => {
                write!(f, "Could not open {}: {}", path.display(), source)
            }
            PngError::NoOpenFile => write!(f, "Reader has no open file"),
            PngError::AlreadyOpen => write!(f, "Reader already has an open file"),
            PngError::EndOfStream => write!(f, "Unexpected end of stream"),
            PngError::Io(err) => write!(f, "I/O error: {}", err),
            PngError::InvalidSignature => write!(f, "Invalid PNG signature"),
            PngError::UnsupportedBitDepth(depth) => write!(f, "Unsupported bit depth: {}", depth),
            PngError::UnsupportedIhdr(msg) => write!(f, "Unsupported IHDR: {}", msg),
            PngError::UnexpectedChunkLayout(msg) => write!(f, "Unexpected chunk layout: {}", msg),
            PngError::CorruptedChunk { chunk, expected, calculated } => write!(
                f,
                "CRC mismatch for chunk {}: expected 0x{:08x}, calculated 0x{:08x}",
                chunk, expected, calculated
            ),
            PngError::CorruptedFilteredStream(msg) => write!(f, "Corrupted filtered stream: {}", msg),
            PngError::DecompressionFailed(msg) => write!(f, "Decompression failed: {}", msg),
            PngError::Unsupported(feature) => write!(f, "Unsupported feature: {}", feature),
            PngError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
        }
    }
}

impl From<io::Error> for PngError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => PngError::EndOfStream,
            _ => PngError::Io(error),
        }
    }
}

// Result type alias for decoder operations
pub type PngResult<T> = Result<T, PngError>;
