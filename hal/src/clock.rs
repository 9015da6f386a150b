//! Clock domain abstraction

use crate::error::HalResult;

/// One gateable clock domain.
///
/// Enable and disable calls nest: the provider keeps a reference count and
/// only gates the clock once every `enable` has been matched by a `disable`.
pub trait ClockPort: Send + Sync {
    /// Take one enable reference
    fn enable(&self) -> HalResult<()>;

    /// Drop one enable reference
    fn disable(&self);

    /// Current rate in Hz
    fn rate_hz(&self) -> u64;
}

#[cfg(feature = "std")]
impl<T: ClockPort + ?Sized> ClockPort for std::sync::Arc<T> {
    fn enable(&self) -> HalResult<()> {
        (**self).enable()
    }

    fn disable(&self) {
        (**self).disable()
    }

    fn rate_hz(&self) -> u64 {
        (**self).rate_hz()
    }
}
