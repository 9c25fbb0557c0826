//! Default mode: listen only.
//!
//! Nothing may be transmitted and nothing is forwarded between buses.

use crate::common::addr_check::AddrCheckTable;
use crate::common::frame::CanFrame;
use crate::state::SafetyState;
use crate::{SafetyHooks, SafetyResult};

/// Safety hooks that never allow output
#[derive(Debug, Clone)]
pub struct NoOutput {
    rx_checks: AddrCheckTable,
    state: SafetyState,
}

impl SafetyHooks for NoOutput {
    type Config = ();

    fn new(_config: ()) -> SafetyResult<Self> {
        Ok(Self {
            rx_checks: AddrCheckTable::empty(),
            state: SafetyState::default(),
        })
    }

    fn initialize(&mut self, _param: u16) -> &AddrCheckTable {
        self.state.reset(0);
        &self.rx_checks
    }

    fn on_receive(&mut self, _frame: &CanFrame) -> bool {
        true
    }

    fn on_transmit(&mut self, _frame: &CanFrame) -> bool {
        false
    }

    fn on_forward(&self, _bus: u8, _frame: &CanFrame) -> Option<u8> {
        None
    }

    fn tick(&mut self) {}

    fn controls_allowed(&self) -> bool {
        self.state.controls_allowed()
    }

    fn relay_malfunction(&self) -> bool {
        self.state.relay_malfunction
    }
}
