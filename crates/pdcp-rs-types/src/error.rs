use core::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sequence number width other than 12 or 18 bits
    UnsupportedSnWidth(u8),

    /// The reordering threshold must allow at least one unit
    InvalidThreshold(u32),

    /// The outstanding gap cap must be in `1..=max`
    InvalidReorderingWindow { got: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            ErrorKind::UnsupportedSnWidth(bits) => write!(
                f,
                "Unsupported sequence number width '{}', expected 12 or 18 bits",
                bits
            ),
            ErrorKind::InvalidThreshold(t) => {
                write!(f, "Invalid reordering threshold {}, must be at least 1", t)
            }
            ErrorKind::InvalidReorderingWindow { got, max } => write!(
                f,
                "Invalid maximum outstanding gap {}, must be between 1 and {}",
                got, max
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Create a new error from a given ErrorKind
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Extract the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Make an error that indicates an unsupported sequence number width
pub fn unsupported_sn_width(bits: u8) -> Error {
    Error::new(ErrorKind::UnsupportedSnWidth(bits))
}

/// Make an error that indicates a reordering threshold of zero
pub fn invalid_threshold(threshold: u32) -> Error {
    Error::new(ErrorKind::InvalidThreshold(threshold))
}

/// Make an error that indicates an outstanding gap cap outside of the reordering window
pub fn invalid_reordering_window(got: u32, max: u32) -> Error {
    Error::new(ErrorKind::InvalidReorderingWindow { got, max })
}
