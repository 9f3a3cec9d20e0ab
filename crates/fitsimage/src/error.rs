use alloc::string::String;

/// All errors that can occur while reading, deriving, or writing images.
#[derive(Debug)]
pub enum Error {
    /// Malformed FITS header block.
    InvalidHeader(&'static str),
    /// Premature end of data while reading.
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    InvalidBitpix(i64),
    /// Malformed keyword name in a header card.
    InvalidKeyword,
    /// A header value could not be parsed correctly.
    InvalidValue,
    /// A required keyword was not found in the header.
    MissingKeyword(&'static str),
    /// A header keyword was looked up but is not present.
    KeyNotFound(String),
    /// A boolean mask does not match the pixel grid it addresses.
    InvalidIndexType(&'static str),
    /// Arguments do not form a usable image or operation.
    InvalidConstructionArguments(&'static str),
    /// Requested extraction region is inverted or falls outside the grid.
    ExtractionOutOfBounds {
        x0: usize,
        x1: usize,
        y0: usize,
        y1: usize,
    },
    /// An array operation produced or received the wrong dimensions.
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Rebinning would invalidate distortion or offset terms it cannot rescale.
    DistortionRescaleUnsupported(&'static str),
    /// Coordinate conversion requested on an image without a sky mapping.
    NoWcs,
    /// Sky position has no solution on this image's tangent plane.
    OutsideProjection,
    /// The requested unit index does not exist in the container.
    UnitNotFound(usize),
    /// The container file does not exist.
    FileNotFound,
    /// The target file already exists and overwrite was not requested.
    FileExists,
    /// An I/O error from the standard library.
    #[cfg(feature = "std")]
    Io(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidHeader(why) => write!(f, "invalid FITS header: {why}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::InvalidBitpix(v) => write!(f, "invalid BITPIX value: {v}"),
            Error::InvalidKeyword => write!(f, "invalid keyword name"),
            Error::InvalidValue => write!(f, "invalid header value"),
            Error::MissingKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::KeyNotFound(key) => write!(f, "header keyword not found: {key}"),
            Error::InvalidIndexType(why) => write!(f, "invalid index: {why}"),
            Error::InvalidConstructionArguments(why) => {
                write!(f, "invalid construction arguments: {why}")
            }
            Error::ExtractionOutOfBounds { x0, x1, y0, y1 } => {
                write!(f, "extraction region (x,y)=[{x0}:{x1},{y0}:{y1}] out of bounds")
            }
            Error::ShapeMismatch { expected, actual } => write!(
                f,
                "shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Error::DistortionRescaleUnsupported(what) => {
                write!(f, "cannot rescale {what} during rebinning")
            }
            Error::NoWcs => write!(f, "image has no sky coordinate mapping"),
            Error::OutsideProjection => write!(f, "position lies outside the tangent plane"),
            Error::UnitNotFound(n) => write!(f, "unit {n} not found in container"),
            Error::FileNotFound => write!(f, "file not found"),
            Error::FileExists => write!(f, "file already exists"),
            #[cfg(feature = "std")]
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound
        } else {
            Error::Io(e)
        }
    }
}
