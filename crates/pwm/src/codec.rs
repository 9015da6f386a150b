//! Bit packing for named register fields.
//!
//! A [`Field`] is a contiguous bit range inside one register. Packing and
//! unpacking are pure; [`Field::write`] goes through
//! [`RegisterPort::update_bits`] so neighbouring fields in the same register
//! are left untouched.

use sti_pwm_hal::{HalResult, RegisterPort};

/// Contiguous bit range `lsb..=msb` inside the register at `reg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub reg: u32,
    pub lsb: u32,
    pub msb: u32,
}

impl Field {
    pub const fn new(reg: u32, lsb: u32, msb: u32) -> Self {
        assert!(lsb <= msb && msb < 32);
        Self { reg, lsb, msb }
    }

    pub const fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }

    /// Largest value the field can hold.
    pub const fn max(&self) -> u32 {
        ((1u64 << self.width()) - 1) as u32
    }

    /// Field bits in register position.
    pub const fn mask(&self) -> u32 {
        self.max() << self.lsb
    }

    /// Shifts `value` into register position. Bits above the field width are
    /// dropped.
    pub fn encode(&self, value: u32) -> u32 {
        debug_assert!(
            value <= self.max(),
            "value {value:#x} does not fit a {}-bit field",
            self.width()
        );
        (value << self.lsb) & self.mask()
    }

    /// Extracts the field from a raw register value.
    pub const fn decode(&self, raw: u32) -> u32 {
        (raw & self.mask()) >> self.lsb
    }

    pub fn read<R: RegisterPort + ?Sized>(&self, regs: &R) -> HalResult<u32> {
        regs.read(self.reg).map(|raw| self.decode(raw))
    }

    pub fn write<R: RegisterPort + ?Sized>(&self, regs: &R, value: u32) -> HalResult<()> {
        regs.update_bits(self.reg, self.mask(), self.encode(value))
    }
}

pub const PRESCALE_LOW_MASK: u32 = 0x0f;
pub const PRESCALE_HIGH_MASK: u32 = 0xf0;

/// Splits an 8-bit prescale into the `(low, high)` nibbles stored in the
/// control register.
pub const fn split_prescale(prescale: u32) -> (u32, u32) {
    (
        prescale & PRESCALE_LOW_MASK,
        (prescale & PRESCALE_HIGH_MASK) >> 4,
    )
}

pub const fn join_prescale(low: u32, high: u32) -> u32 {
    (low & PRESCALE_LOW_MASK) | ((high << 4) & PRESCALE_HIGH_MASK)
}
