//! Register bus abstraction

use crate::error::HalResult;

/// Width of one register slot in bytes.
pub const REG_STRIDE: u32 = 4;

/// Synchronous access to a 32-bit register window.
///
/// Implementations are shared between caller threads and the interrupt
/// dispatch context, so every method takes `&self`. `update_bits` must be
/// atomic with respect to every other access on the same port: two fields that
/// live in one register are updated from different contexts.
pub trait RegisterPort: Send + Sync {
    /// Read the register at `offset`
    fn read(&self, offset: u32) -> HalResult<u32>;

    /// Write `value` to the register at `offset`
    fn write(&self, offset: u32, value: u32) -> HalResult<()>;

    /// Replace the bits selected by `mask` with the matching bits of `value`
    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> HalResult<()>;
}

impl<T: RegisterPort + ?Sized> RegisterPort for &T {
    fn read(&self, offset: u32) -> HalResult<u32> {
        (**self).read(offset)
    }

    fn write(&self, offset: u32, value: u32) -> HalResult<()> {
        (**self).write(offset, value)
    }

    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> HalResult<()> {
        (**self).update_bits(offset, mask, value)
    }
}

#[cfg(feature = "std")]
impl<T: RegisterPort + ?Sized> RegisterPort for std::sync::Arc<T> {
    fn read(&self, offset: u32) -> HalResult<u32> {
        (**self).read(offset)
    }

    fn write(&self, offset: u32, value: u32) -> HalResult<()> {
        (**self).write(offset, value)
    }

    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> HalResult<()> {
        (**self).update_bits(offset, mask, value)
    }
}
