//! In-memory port implementations for host testing
//!
//! [`MockRegisters`] models a register window with optional write-1-to-clear
//! acknowledge aliases, a journal of every access, and per-offset fault
//! injection. [`MockClock`] counts enable references and can be told to fail.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::clock::ClockPort;
use crate::error::{HalError, HalResult};
use crate::register::{RegisterPort, REG_STRIDE};

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { offset: u32, value: u32 },
    Write { offset: u32, value: u32 },
    Update { offset: u32, mask: u32, value: u32 },
}

impl Access {
    pub fn offset(&self) -> u32 {
        match *self {
            Self::Read { offset, .. } | Self::Write { offset, .. } | Self::Update { offset, .. } => {
                offset
            }
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Read { .. })
    }
}

#[derive(Default)]
struct RegisterFile {
    values: BTreeMap<u32, u32>,
    journal: Vec<Access>,
    // ack offset -> status offset
    clear_aliases: BTreeMap<u32, u32>,
    failing_reads: BTreeSet<u32>,
    failing_writes: BTreeSet<u32>,
}

impl RegisterFile {
    fn get(&self, offset: u32) -> u32 {
        self.values.get(&offset).copied().unwrap_or(0)
    }

    fn store(&mut self, offset: u32, value: u32) {
        if let Some(&status) = self.clear_aliases.get(&offset) {
            let current = self.get(status);
            self.values.insert(status, current & !value);
        } else {
            self.values.insert(offset, value);
        }
    }
}

/// Register window backed by a map, zero-initialised.
pub struct MockRegisters {
    size: u32,
    inner: Mutex<RegisterFile>,
}

impl MockRegisters {
    /// Creates a window of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            inner: Mutex::new(RegisterFile::default()),
        }
    }

    /// Writes to `ack` clear the written bits in `status` instead of storing.
    pub fn with_clear_alias(self, ack: u32, status: u32) -> Self {
        self.inner.lock().clear_aliases.insert(ack, status);
        self
    }

    /// Returns the raw register value without journaling.
    pub fn peek(&self, offset: u32) -> u32 {
        self.inner.lock().get(offset)
    }

    /// Sets a register as the hardware would, without journaling.
    pub fn poke(&self, offset: u32, value: u32) {
        self.inner.lock().values.insert(offset, value);
    }

    /// ORs `bits` into a register as the hardware would, without journaling.
    pub fn raise(&self, offset: u32, bits: u32) {
        let mut inner = self.inner.lock();
        let current = inner.get(offset);
        inner.values.insert(offset, current | bits);
    }

    pub fn journal(&self) -> Vec<Access> {
        self.inner.lock().journal.clone()
    }

    /// Recorded writes and updates, reads filtered out.
    pub fn writes(&self) -> Vec<Access> {
        self.inner
            .lock()
            .journal
            .iter()
            .copied()
            .filter(Access::is_write)
            .collect()
    }

    pub fn clear_journal(&self) {
        self.inner.lock().journal.clear();
    }

    pub fn fail_reads_from(&self, offset: u32) {
        self.inner.lock().failing_reads.insert(offset);
    }

    pub fn fail_writes_to(&self, offset: u32) {
        self.inner.lock().failing_writes.insert(offset);
    }

    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock();
        inner.failing_reads.clear();
        inner.failing_writes.clear();
    }

    fn check(&self, offset: u32) -> HalResult<()> {
        if offset % REG_STRIDE != 0 || offset >= self.size {
            return Err(HalError::BadOffset(offset));
        }
        Ok(())
    }
}

impl RegisterPort for MockRegisters {
    fn read(&self, offset: u32) -> HalResult<u32> {
        self.check(offset)?;
        let mut inner = self.inner.lock();
        if inner.failing_reads.contains(&offset) {
            return Err(HalError::BusRead(offset));
        }
        let value = inner.get(offset);
        inner.journal.push(Access::Read { offset, value });
        Ok(value)
    }

    fn write(&self, offset: u32, value: u32) -> HalResult<()> {
        self.check(offset)?;
        let mut inner = self.inner.lock();
        if inner.failing_writes.contains(&offset) {
            return Err(HalError::BusWrite(offset));
        }
        inner.store(offset, value);
        inner.journal.push(Access::Write { offset, value });
        Ok(())
    }

    fn update_bits(&self, offset: u32, mask: u32, value: u32) -> HalResult<()> {
        self.check(offset)?;
        let mut inner = self.inner.lock();
        if inner.failing_writes.contains(&offset) {
            return Err(HalError::BusWrite(offset));
        }
        let current = inner.get(offset);
        inner.store(offset, (current & !mask) | (value & mask));
        inner.journal.push(Access::Update {
            offset,
            mask,
            value,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ClockState {
    refs: u32,
    enables: u64,
    underflows: u32,
    fail_enable: bool,
}

/// Reference-counting clock with a fixed rate.
pub struct MockClock {
    name: &'static str,
    rate_hz: u64,
    state: Mutex<ClockState>,
}

impl MockClock {
    pub fn new(name: &'static str, rate_hz: u64) -> Self {
        Self {
            name,
            rate_hz,
            state: Mutex::new(ClockState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Outstanding enable references.
    pub fn refs(&self) -> u32 {
        self.state.lock().refs
    }

    pub fn is_enabled(&self) -> bool {
        self.refs() > 0
    }

    /// Successful `enable` calls since creation.
    pub fn total_enables(&self) -> u64 {
        self.state.lock().enables
    }

    /// `disable` calls made with no reference outstanding.
    pub fn underflows(&self) -> u32 {
        self.state.lock().underflows
    }

    /// Makes subsequent `enable` calls fail until reset.
    pub fn set_fail_enable(&self, fail: bool) {
        self.state.lock().fail_enable = fail;
    }
}

impl ClockPort for MockClock {
    fn enable(&self) -> HalResult<()> {
        let mut state = self.state.lock();
        if state.fail_enable {
            return Err(HalError::ClockEnable);
        }
        state.refs += 1;
        state.enables += 1;
        Ok(())
    }

    fn disable(&self) {
        let mut state = self.state.lock();
        match state.refs.checked_sub(1) {
            Some(refs) => state.refs = refs,
            None => state.underflows += 1,
        }
    }

    fn rate_hz(&self) -> u64 {
        self.rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_alias_clears_status_bits() {
        let regs = MockRegisters::new(0x60).with_clear_alias(0x5c, 0x58);
        regs.raise(0x58, 0b0110);
        regs.write(0x5c, 0b0010).unwrap();
        assert_eq!(regs.peek(0x58), 0b0100);
        assert_eq!(regs.peek(0x5c), 0);
    }

    #[test]
    fn update_bits_preserves_unmasked_bits() {
        let regs = MockRegisters::new(0x60);
        regs.poke(0x50, 0xffff_0000);
        regs.update_bits(0x50, 0x0000_00f0, 0x0000_00a5).unwrap();
        assert_eq!(regs.peek(0x50), 0xffff_00a0);
    }

    #[test]
    fn rejects_unaligned_and_out_of_window_offsets() {
        let regs = MockRegisters::new(0x60);
        assert_eq!(regs.read(0x02), Err(HalError::BadOffset(0x02)));
        assert_eq!(regs.write(0x60, 1), Err(HalError::BadOffset(0x60)));
    }

    #[test]
    fn injected_faults_are_reported() {
        let regs = MockRegisters::new(0x60);
        regs.fail_writes_to(0x50);
        assert_eq!(regs.write(0x50, 1), Err(HalError::BusWrite(0x50)));
        assert_eq!(regs.update_bits(0x50, 1, 1), Err(HalError::BusWrite(0x50)));
        regs.clear_faults();
        assert!(regs.write(0x50, 1).is_ok());
    }

    #[test]
    fn clock_counts_references() {
        let clk = MockClock::new("pwm", 100_000_000);
        clk.enable().unwrap();
        clk.enable().unwrap();
        clk.disable();
        assert!(clk.is_enabled());
        clk.disable();
        assert!(!clk.is_enabled());
        clk.disable();
        assert_eq!(clk.underflows(), 1);
        assert_eq!(clk.total_enables(), 2);
    }

    #[test]
    fn clock_enable_failure_takes_no_reference() {
        let clk = MockClock::new("capture", 1_000_000);
        clk.set_fail_enable(true);
        assert_eq!(clk.enable(), Err(HalError::ClockEnable));
        assert_eq!(clk.refs(), 0);
    }
}
