//! Address and cadence validation for received messages.
//!
//! Each platform declares the messages it relies on as an [`AddrCheckTable`].
//! The table records arrival times on receive; the 1 Hz housekeeping tick
//! then flags every entry whose message has stopped arriving.

use crate::common::frame::{CanFrame, MAX_FRAME_LEN};
use crate::common::limits::ts_elapsed;
use crate::common::validation;
use crate::SafetyResult;

/// A message counts as lagging after this many expected periods without it.
pub const MAX_MISSED_MSGS: u32 = 10;

/// Lower bound on the lag threshold, in microseconds.
pub const MIN_LAG_THRESHOLD_US: u32 = 1_000_000;

/// One expected inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrCheck {
    /// CAN address
    pub addr: u32,
    /// Bus the message must arrive on
    pub bus: u8,
    /// Expected DLC
    pub len: u8,
    /// Expected period between frames, in microseconds
    pub expected_timestep_us: u32,
}

impl AddrCheck {
    pub const fn new(addr: u32, bus: u8, len: u8, expected_timestep_us: u32) -> Self {
        Self {
            addr,
            bus,
            len,
            expected_timestep_us,
        }
    }

    fn matches(&self, frame: &CanFrame) -> bool {
        self.addr == frame.addr() && self.bus == frame.bus() && self.len == frame.len()
    }

    fn lag_threshold_us(&self) -> u32 {
        self.expected_timestep_us
            .saturating_mul(MAX_MISSED_MSGS)
            .max(MIN_LAG_THRESHOLD_US)
    }
}

/// Runtime bookkeeping for one [`AddrCheck`] entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddrCheckStatus {
    pub last_timestamp: u32,
    pub lagging: bool,
}

/// The set of inbound messages a platform depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrCheckTable {
    checks: Vec<AddrCheck>,
    status: Vec<AddrCheckStatus>,
}

impl AddrCheckTable {
    /// # Errors
    /// Returns `SafetyError::InvalidConfiguration` for duplicate entries,
    /// zero periods or lengths above 8 bytes.
    pub fn new(checks: &[AddrCheck]) -> SafetyResult<Self> {
        for (i, check) in checks.iter().enumerate() {
            validation::validate_frame_len(check.len, MAX_FRAME_LEN as u8)?;
            validation::validate_nonzero("expected_timestep_us", check.expected_timestep_us)?;
            if checks[..i]
                .iter()
                .any(|c| c.addr == check.addr && c.bus == check.bus && c.len == check.len)
            {
                return Err(crate::SafetyError::InvalidConfiguration(format!(
                    "Duplicate address check for 0x{:X} on bus {}",
                    check.addr, check.bus
                )));
            }
        }
        Ok(Self {
            checks: checks.to_vec(),
            status: vec![AddrCheckStatus::default(); checks.len()],
        })
    }

    /// An empty table, for platforms that read nothing.
    pub fn empty() -> Self {
        Self {
            checks: Vec::new(),
            status: Vec::new(),
        }
    }

    pub fn checks(&self) -> &[AddrCheck] {
        &self.checks
    }

    pub fn status(&self, index: usize) -> Option<&AddrCheckStatus> {
        self.status.get(index)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Index of the entry matching the frame's address, bus and length.
    pub fn index_of(&self, frame: &CanFrame) -> Option<usize> {
        self.checks.iter().position(|c| c.matches(frame))
    }

    /// Clear all runtime bookkeeping.
    pub fn reset(&mut self) {
        self.status
            .iter_mut()
            .for_each(|s| *s = AddrCheckStatus::default());
    }

    /// Validate a received frame and record its arrival.
    ///
    /// Only cadence is checked here, and an arrival is by definition on time:
    /// missing messages surface through [`AddrCheckTable::update_lagging`].
    /// Frames not listed in the table are always valid.
    pub fn validate(&mut self, frame: &CanFrame, now_us: u32) -> bool {
        if let Some(index) = self.index_of(frame) {
            self.status[index].last_timestamp = now_us;
        }
        true
    }

    /// Refresh the lagging flag of every entry.
    ///
    /// Returns `true` if every entry is fresh.
    pub fn update_lagging(&mut self, now_us: u32) -> bool {
        let mut healthy = true;
        for (check, status) in self.checks.iter().zip(self.status.iter_mut()) {
            let elapsed = ts_elapsed(now_us, status.last_timestamp);
            status.lagging = elapsed > check.lag_threshold_us();
            if status.lagging {
                tracing::warn!(
                    addr = check.addr,
                    bus = check.bus,
                    elapsed_us = elapsed,
                    "Message lagging"
                );
            }
            healthy &= !status.lagging;
        }
        healthy
    }
}
