//! Register map of the PWM block.

use crate::codec::Field;

/// Duty compare value for output channel `n`.
pub const fn out_val(n: u32) -> u32 {
    4 * n
}

/// Counter snapshot latched on the armed edge of capture channel `n`.
pub const fn cpt_val(n: u32) -> u32 {
    0x10 + 4 * n
}

/// Edge selection for capture channel `n`.
pub const fn cpt_edge(n: u32) -> u32 {
    0x30 + 4 * n
}

pub const CTRL: u32 = 0x50;
pub const INT_EN: u32 = 0x54;
pub const INT_STA: u32 = 0x58;
pub const INT_ACK: u32 = 0x5c;

/// Size of the register window in bytes.
pub const WINDOW_SIZE: u32 = 0x60;

/// Acknowledge value covering every status bit.
pub const INT_ACK_MASK: u32 = 0x1ff;
pub const CPT_EDGE_MASK: u32 = 0x03;

pub const MAX_OUTPUT_CHANNELS: u32 = 4;
pub const MAX_CAPTURE_CHANNELS: u32 = 4;

pub const PWMCLK_PRESCALE_LOW: Field = Field::new(CTRL, 0, 3);
pub const PWMCLK_PRESCALE_HIGH: Field = Field::new(CTRL, 11, 14);
pub const CPTCLK_PRESCALE: Field = Field::new(CTRL, 4, 8);
pub const PWM_OUT_EN: Field = Field::new(CTRL, 9, 9);
pub const PWM_CPT_EN: Field = Field::new(CTRL, 10, 10);
pub const PWM_CPT_INT_EN: Field = Field::new(INT_EN, 1, 4);
pub const PWM_CPT_INT_STAT: Field = Field::new(INT_STA, 1, 4);

/// Edge the capture logic latches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEdge {
    Disabled = 0,
    Rising = 1,
    Falling = 2,
    Both = 3,
}

impl CaptureEdge {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub fn from_bits(raw: u32) -> Self {
        match raw & CPT_EDGE_MASK {
            0 => Self::Disabled,
            1 => Self::Rising,
            2 => Self::Falling,
            _ => Self::Both,
        }
    }

    /// XOR with the edge mask, so rising and falling swap.
    pub fn toggled(self) -> Self {
        Self::from_bits(self.bits() ^ CPT_EDGE_MASK)
    }
}
