use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// A compression unit was built from bytes that aren't exactly one complete MessagePack
    /// value: either a truncated value, or a value followed by extra bytes.
    InvalidFieldSpan {
        /// Length of the span that was provided
        span: usize,
        /// Length of the first complete value in it, if one could be read at all
        value: Option<usize>,
    },
    /// A compression backend rejected the input or broke its own size bound while encoding.
    Backend(CompressionError),
    /// A compressed field on the wire was malformed: unknown algorithm tag, inconsistent lengths,
    /// a backend failure while decompressing, or output that didn't match its declared size.
    Format(String),
    /// The scratch arena couldn't satisfy an allocation.
    Allocation { requested: usize, available: usize },
    /// Basic MessagePack encoding failure outside of a compressed field.
    BadEncode(String),
    /// MessagePack data ended too early.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Printing hit the nesting limit.
    ParseLimit(String),
    /// Writing rendered output failed.
    Io(std::io::Error),
}

impl Error {
    /// Whether this error came from malformed compressed-field bytes.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidFieldSpan { span, value } => match value {
                Some(value) => write!(
                    f,
                    "Field span is {} bytes, but holds a {}-byte value followed by trailing data",
                    span, value
                ),
                None => write!(
                    f,
                    "Field span of {} bytes doesn't hold one complete value",
                    span
                ),
            },
            Error::Backend(ref err) => write!(f, "Compression backend failed: {}", err),
            Error::Format(ref err) => write!(f, "Malformed compressed field: {}", err),
            Error::Allocation {
                requested,
                available,
            } => write!(
                f,
                "Arena exhausted: requested {} bytes, {} available",
                requested, available
            ),
            Error::BadEncode(ref err) => write!(f, "Basic data encoding failure: {}", err),
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::Io(ref err) => write!(f, "Couldn't write output: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Backend(ref err) => Some(err),
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CompressionError> for Error {
    fn from(e: CompressionError) -> Self {
        Self::Backend(e)
    }
}

/// Failures reported by a compression backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// zstd returned an error code.
    ZstdInner(usize),
    /// lz4 rejected the input or the destination.
    Lz4(String),
    /// The backend wrote more than its own bound allowed.
    BoundExceeded { bound: usize, actual: usize },
    /// Decompression produced a different number of bytes than the payload promised.
    SizeMismatch { expected: usize, actual: usize },
    /// The destination handed to the backend was too small.
    DestinationTooSmall { needed: usize, actual: usize },
    /// The payload header couldn't be parsed.
    Parsing(&'static str),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::ZstdInner(v) => {
                let e_str = zstd_safe::get_error_name(*v);
                write!(f, "zstd failure, code {} ({})", v, e_str)
            }
            CompressionError::Lz4(s) => write!(f, "lz4 failure: {}", s),
            CompressionError::BoundExceeded { bound, actual } => write!(
                f,
                "Compressed to {} bytes, more than the bound of {}",
                actual, bound
            ),
            CompressionError::SizeMismatch { expected, actual } => write!(
                f,
                "Decompressed to {} bytes, but {} were promised",
                actual, expected
            ),
            CompressionError::DestinationTooSmall { needed, actual } => write!(
                f,
                "Destination holds {} bytes, but {} are needed",
                actual, needed
            ),
            CompressionError::Parsing(s) => f.write_str(s),
        }
    }
}

impl std::error::Error for CompressionError {}

impl From<zstd_safe::ErrorCode> for CompressionError {
    fn from(value: zstd_safe::ErrorCode) -> Self {
        CompressionError::ZstdInner(value)
    }
}
