//! Frame builders and a small harness shared by the integration tests.

#![allow(dead_code)]

use vehicle_safety_hooks::common::frame::to_unsigned;
use vehicle_safety_hooks::platforms::subaru_legacy::{SubaruLegacy, SubaruLegacyConfig};
use vehicle_safety_hooks::state::RELAY_TRNS_TIMEOUT;
use vehicle_safety_hooks::{CanFrame, ManualClock, SafetyHooks};

pub const MAX_RATE_UP: i32 = 50;
pub const MAX_RATE_DOWN: i32 = 70;
pub const MAX_STEER: i32 = 2047;
pub const MAX_RT_DELTA: i32 = 940;
pub const RT_INTERVAL: u32 = 250_000;
pub const DRIVER_TORQUE_ALLOWANCE: i32 = 60;
pub const DRIVER_TORQUE_FACTOR: i32 = 10;
pub const BRAKE_THRESHOLD: u8 = 2;
pub const STANDSTILL_THRESHOLD: u16 = 20;

pub const TX_MSGS: [(u32, u8); 3] = [(0x161, 0), (0x164, 0), (0x140, 2)];

pub struct Harness {
    pub hooks: SubaruLegacy<ManualClock>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(param: u16) -> Self {
        let clock = ManualClock::new(0);
        let mut hooks = SubaruLegacy::with_clock(SubaruLegacyConfig::default(), clock.clone())
            .expect("default config is valid");
        hooks.initialize(param);
        Self { hooks, clock }
    }

    /// Reset the clock and all state, as between independent test cases.
    pub fn reset(&mut self, param: u16) {
        self.clock.set(0);
        self.hooks.initialize(param);
    }

    /// Let enough housekeeping ticks pass for relay detection to arm.
    pub fn settle(&mut self) {
        for _ in 0..=RELAY_TRNS_TIMEOUT {
            self.hooks.tick();
        }
    }

    pub fn rx(&mut self, frame: CanFrame) -> bool {
        self.hooks.on_receive(&frame)
    }

    pub fn tx(&mut self, frame: CanFrame) -> bool {
        self.hooks.on_transmit(&frame)
    }

    pub fn set_controls_allowed(&mut self, allowed: bool) {
        self.hooks.state_mut().controls.controls_allowed = allowed;
    }

    pub fn controls_allowed(&self) -> bool {
        self.hooks.controls_allowed()
    }

    pub fn set_prev_torque(&mut self, t: i32) {
        let limiter = &mut self.hooks.state_mut().limiter;
        limiter.desired_torque_last = t;
        limiter.rt_torque_last = t;
    }

    pub fn set_torque_driver(&mut self, min_t: i32, max_t: i32) {
        for _ in 0..5 {
            self.rx(torque_driver_msg(min_t));
        }
        self.rx(torque_driver_msg(max_t));
    }
}

pub fn torque_driver_msg(torque: i32) -> CanFrame {
    let raw = to_unsigned(torque, 11);
    let mut data = [0u8; 8];
    data[3] = ((raw & 0x7) << 5) as u8;
    data[4] = (raw >> 3) as u8;
    CanFrame::from_bytes(0x371, 0, data)
}

pub fn speed_msg(speed: u16) -> CanFrame {
    let mut data = [0u8; 8];
    for corner in 0..4 {
        data[corner * 2..corner * 2 + 2].copy_from_slice(&speed.to_le_bytes());
    }
    CanFrame::from_bytes(0xD4, 0, data)
}

/// Readings below the noise threshold are bumped above it so "pressed" means pressed.
pub fn brake_msg(brake: u8) -> CanFrame {
    let brake = if brake > 0 && brake <= BRAKE_THRESHOLD {
        BRAKE_THRESHOLD + 1
    } else {
        brake
    };
    let mut data = [0u8; 8];
    data[2] = brake;
    CanFrame::from_bytes(0xD1, 0, data)
}

pub fn torque_msg(torque: i32) -> CanFrame {
    let raw = to_unsigned(-torque, 13) << 8;
    let mut data = [0u8; 8];
    data[..4].copy_from_slice(&raw.to_le_bytes());
    CanFrame::from_bytes(0x164, 0, data)
}

pub fn gas_msg(gas: u8) -> CanFrame {
    let mut data = [0u8; 8];
    data[0] = gas;
    CanFrame::from_bytes(0x140, 0, data)
}

pub fn pcm_status_msg(enable: bool) -> CanFrame {
    let mut data = [0u8; 8];
    data[6] = (enable as u8) << 1;
    CanFrame::from_bytes(0x144, 0, data)
}
