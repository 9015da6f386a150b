//! Common error types for port operations

use core::fmt;

/// Port operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Register read failed at the given offset
    BusRead(u32),
    /// Register write failed at the given offset
    BusWrite(u32),
    /// Offset is not 4-byte aligned or lies outside the register window
    BadOffset(u32),
    /// Clock could not be enabled
    ClockEnable,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusRead(offset) => write!(f, "bus error reading register {offset:#06x}"),
            Self::BusWrite(offset) => write!(f, "bus error writing register {offset:#06x}"),
            Self::BadOffset(offset) => write!(f, "invalid register offset {offset:#06x}"),
            Self::ClockEnable => write!(f, "failed to enable clock"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Result type for port operations
pub type HalResult<T> = Result<T, HalError>;
