//! # Subaru pre-global platform (Outback / Legacy)
//!
//! Steering is commanded with a single torque message (ES_LKAS, 0x164).
//! The platform reports driver torque, so the per-message rate limit relaxes
//! while the driver pushes against the command.
//!
//! # Buses
//! - bus 0: vehicle CAN
//! - bus 2: camera (EyeSight) CAN
//!
//! # Safety parameter
//! Bit 0 (`PARAM_FLIP_DRIVER_TORQUE`) flips the sign of the driver torque
//! sensor, which is mounted the other way round on 2019+ cars.

use crate::common::addr_check::{AddrCheck, AddrCheckTable};
use crate::common::clock::{MicrosecondClock, MonotonicClock};
use crate::common::frame::{msg_allowed, to_signed, CanFrame, CanMsg, MAX_FRAME_LEN};
use crate::common::limits::SteerLimits;
use crate::common::validation;
use crate::state::{SafetyState, TxVerdict};
use crate::{SafetyError, SafetyHooks, SafetyResult};
use tracing::debug;

/// Safety parameter flag: negate the driver torque reading.
pub const PARAM_FLIP_DRIVER_TORQUE: u16 = 1;

const DRIVER_TORQUE_BITS: u32 = 11;
const STEER_CMD_BITS: u32 = 13;
const STEER_CMD_MASK: u32 = 0x1FFF;

/// Largest magnitude a 13-bit steering command can carry.
const STEER_CMD_RANGE: i32 = 1 << (STEER_CMD_BITS - 1);
/// Largest magnitude an 11-bit driver torque reading can carry.
const DRIVER_TORQUE_RANGE: i32 = 1 << (DRIVER_TORQUE_BITS - 1);

/// Message addresses used by the hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubaruLegacyMsgIds {
    /// Steering_Torque: driver torque sensor
    pub steering_torque: u32,
    /// CruiseControl: cruise activated flag
    pub cruise_control: u32,
    /// Wheel_Speeds
    pub wheel_speeds: u32,
    /// Brake_Pedal
    pub brake_pedal: u32,
    /// Throttle: pedal position, also sent by us to the camera
    pub throttle: u32,
    /// ES_CruiseThrottle
    pub es_cruise_throttle: u32,
    /// ES_LKAS: steering torque command
    pub es_lkas: u32,
}

impl Default for SubaruLegacyMsgIds {
    fn default() -> Self {
        Self {
            steering_torque: 0x371,
            cruise_control: 0x144,
            wheel_speeds: 0xD4,
            brake_pedal: 0xD1,
            throttle: 0x140,
            es_cruise_throttle: 0x161,
            es_lkas: 0x164,
        }
    }
}

/// Configuration for the Subaru pre-global platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubaruLegacyConfig {
    /// Steering torque limits
    pub steer: SteerLimits,
    /// Average wheel speed above which the car is moving (about 1 kph)
    pub standstill_threshold: u32,
    /// Brake pedal reading above which the brake counts as pressed
    pub brake_threshold: u8,
    /// Message addresses
    pub msg_ids: SubaruLegacyMsgIds,
    /// Frames the controller may transmit
    pub tx_msgs: Vec<CanMsg>,
    /// Inbound messages monitored for cadence
    pub addr_checks: Vec<AddrCheck>,
    /// Vehicle bus index
    pub main_bus: u8,
    /// Camera bus index
    pub camera_bus: u8,
}

impl Default for SubaruLegacyConfig {
    fn default() -> Self {
        let msg_ids = SubaruLegacyMsgIds::default();
        Self {
            steer: SteerLimits {
                max_steer: 2047,
                // 1500/sec real time limit
                max_rt_delta: 940,
                rt_interval_us: 250_000,
                max_rate_up: 50,
                max_rate_down: 70,
                driver_torque_allowance: 60,
                driver_torque_factor: 10,
            },
            standstill_threshold: 20,
            // max brake reading is 400
            brake_threshold: 2,
            tx_msgs: vec![
                CanMsg::new(msg_ids.es_cruise_throttle, 0, 8),
                CanMsg::new(msg_ids.es_lkas, 0, 8),
                CanMsg::new(msg_ids.throttle, 2, 8),
            ],
            // TODO: add checksum and counter checks once the signals are mapped for these messages
            addr_checks: vec![
                AddrCheck::new(msg_ids.throttle, 0, 8, 10_000),
                AddrCheck::new(msg_ids.steering_torque, 0, 8, 20_000),
                AddrCheck::new(msg_ids.cruise_control, 0, 8, 50_000),
            ],
            msg_ids,
            main_bus: 0,
            camera_bus: 2,
        }
    }
}

impl SubaruLegacyConfig {
    fn validate(&self) -> SafetyResult<()> {
        let steer = &self.steer;
        validation::validate_positive("max_steer", steer.max_steer)?;
        validation::validate_positive("max_rt_delta", steer.max_rt_delta)?;
        validation::validate_positive("max_rate_up", steer.max_rate_up)?;
        validation::validate_positive("max_rate_down", steer.max_rate_down)?;
        validation::validate_positive("driver_torque_factor", steer.driver_torque_factor)?;
        validation::validate_nonzero("rt_interval_us", steer.rt_interval_us)?;
        validation::validate_not_above("max_steer", steer.max_steer, STEER_CMD_RANGE)?;
        validation::validate_not_above("max_rt_delta", steer.max_rt_delta, STEER_CMD_RANGE)?;
        validation::validate_not_above("max_rate_up", steer.max_rate_up, steer.max_steer)?;
        validation::validate_not_above("max_rate_down", steer.max_rate_down, STEER_CMD_RANGE)?;
        if steer.driver_torque_allowance < 0 {
            return Err(SafetyError::InvalidConfiguration(
                "driver_torque_allowance must not be negative".into(),
            ));
        }
        validation::validate_not_above(
            "driver_torque_allowance",
            steer.driver_torque_allowance,
            DRIVER_TORQUE_RANGE,
        )?;
        // the driver-scaled steer limit must stay representable for any reading
        let driver_limit = (steer.driver_torque_allowance + DRIVER_TORQUE_RANGE)
            .checked_mul(steer.driver_torque_factor)
            .and_then(|scaled| scaled.checked_add(steer.max_steer));
        if driver_limit.is_none() {
            return Err(SafetyError::InvalidConfiguration(format!(
                "driver_torque_factor {} overflows the driver torque limit",
                steer.driver_torque_factor
            )));
        }
        for msg in &self.tx_msgs {
            validation::validate_frame_len(msg.len, MAX_FRAME_LEN as u8)?;
        }
        if self.addr_checks.is_empty() {
            return Err(SafetyError::InvalidConfiguration(
                "At least one address check is required".into(),
            ));
        }
        if self.main_bus == self.camera_bus {
            return Err(SafetyError::InvalidConfiguration(
                "Vehicle and camera buses must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Safety hooks for the Subaru pre-global platform
#[derive(Debug, Clone)]
pub struct SubaruLegacy<C: MicrosecondClock = MonotonicClock> {
    config: SubaruLegacyConfig,
    rx_checks: AddrCheckTable,
    state: SafetyState,
    flip_driver_torque: bool,
    clock: C,
}

impl<C: MicrosecondClock> SubaruLegacy<C> {
    /// Create the hooks with an explicit timer source.
    ///
    /// # Errors
    /// Returns `SafetyError::InvalidConfiguration` if the configuration is invalid
    pub fn with_clock(config: SubaruLegacyConfig, clock: C) -> SafetyResult<Self> {
        config.validate()?;
        let rx_checks = AddrCheckTable::new(&config.addr_checks)?;
        let mut state = SafetyState::default();
        state.reset(clock.now_us());
        Ok(Self {
            config,
            rx_checks,
            state,
            flip_driver_torque: false,
            clock,
        })
    }

    pub fn config(&self) -> &SubaruLegacyConfig {
        &self.config
    }

    pub fn state(&self) -> &SafetyState {
        &self.state
    }

    /// Direct state access, for test harnesses and replay tools.
    pub fn state_mut(&mut self) -> &mut SafetyState {
        &mut self.state
    }

    pub fn rx_checks(&self) -> &AddrCheckTable {
        &self.rx_checks
    }

    pub fn flip_driver_torque(&self) -> bool {
        self.flip_driver_torque
    }

    fn decode_driver_torque(&self, frame: &CanFrame) -> i32 {
        let raw = (u32::from(frame.byte(3)) >> 5) + (u32::from(frame.byte(4)) << 3);
        let torque = to_signed(raw, DRIVER_TORQUE_BITS);
        if self.flip_driver_torque {
            -torque
        } else {
            torque
        }
    }

    fn decode_desired_torque(frame: &CanFrame) -> i32 {
        -to_signed((frame.bytes_04() >> 8) & STEER_CMD_MASK, STEER_CMD_BITS)
    }

    fn update_from_vehicle_bus(&mut self, frame: &CanFrame) {
        let ids = self.config.msg_ids;
        let addr = frame.addr();

        if addr == ids.steering_torque {
            let torque = self.decode_driver_torque(frame);
            self.state.torque_driver.update(torque);
        }

        // enter controls on rising edge of cruise, exit controls on cruise off
        if addr == ids.cruise_control {
            let cruise_engaged = (frame.byte(6) >> 1) & 1 == 1;
            self.state.controls.update_cruise(cruise_engaged);
        }

        // average opposite corners: FR and RL
        if addr == ids.wheel_speeds {
            let fr = (frame.bytes_04() >> 16) & 0xFFFF;
            let rl = frame.bytes_48() & 0xFFFF;
            let speed = (fr + rl) / 2;
            self.state.motion.vehicle_moving = speed > self.config.standstill_threshold;
        }

        if addr == ids.brake_pedal {
            self.state.motion.brake_pressed = frame.byte(2) > self.config.brake_threshold;
        }

        if addr == ids.throttle {
            self.state.motion.gas_pressed = frame.byte(0) != 0;
        }

        // our own steering command on the vehicle bus means the stock camera is still connected
        self.state.generic_rx_checks(addr == ids.es_lkas);
    }
}

impl<C: MicrosecondClock + Default> SafetyHooks for SubaruLegacy<C> {
    type Config = SubaruLegacyConfig;

    fn new(config: Self::Config) -> SafetyResult<Self> {
        Self::with_clock(config, C::default())
    }

    fn initialize(&mut self, param: u16) -> &AddrCheckTable {
        self.state.reset(self.clock.now_us());
        self.rx_checks.reset();
        self.flip_driver_torque = param & PARAM_FLIP_DRIVER_TORQUE == PARAM_FLIP_DRIVER_TORQUE;
        debug!(
            param,
            flip_driver_torque = self.flip_driver_torque,
            "Subaru legacy safety initialized"
        );
        &self.rx_checks
    }

    fn on_receive(&mut self, frame: &CanFrame) -> bool {
        let now = self.clock.now_us();
        let valid = self.rx_checks.validate(frame, now);

        if valid && frame.bus() == self.config.main_bus {
            self.update_from_vehicle_bus(frame);
        }
        valid
    }

    fn on_transmit(&mut self, frame: &CanFrame) -> bool {
        let mut tx = msg_allowed(frame, &self.config.tx_msgs);

        if self.state.relay_malfunction {
            tx = false;
        }

        if frame.addr() == self.config.msg_ids.es_lkas {
            let desired_torque = Self::decode_desired_torque(frame);
            let now = self.clock.now_us();
            let (verdict, next) = self.state.limiter.evaluate(
                &self.config.steer,
                desired_torque,
                now,
                self.state.controls_allowed(),
                &self.state.torque_driver,
            );
            self.state.limiter = next;

            if let TxVerdict::Blocked(violation) = verdict {
                debug!(
                    desired_torque,
                    max_limit = violation.max_limit,
                    driver_rate = violation.driver_rate,
                    realtime_rate = violation.realtime_rate,
                    controls_not_allowed = violation.controls_not_allowed,
                    "Steering command blocked"
                );
                tx = false;
            }
        }
        tx
    }

    fn on_forward(&self, bus: u8, frame: &CanFrame) -> Option<u8> {
        if self.state.relay_malfunction {
            return None;
        }
        let ids = &self.config.msg_ids;
        let addr = frame.addr();

        if bus == self.config.main_bus {
            // the camera must not see our throttle
            if addr == ids.throttle {
                return None;
            }
            return Some(self.config.camera_bus);
        }
        if bus == self.config.camera_bus {
            // replaced by our own ES_CruiseThrottle and ES_LKAS
            if addr == ids.es_cruise_throttle || addr == ids.es_lkas {
                return None;
            }
            return Some(self.config.main_bus);
        }
        None
    }

    fn tick(&mut self) {
        let now = self.clock.now_us();
        self.state.mode_ticks = self.state.mode_ticks.saturating_add(1);
        if !self.rx_checks.update_lagging(now) {
            self.state.controls.disallow("rx checks failing");
        }
    }

    fn controls_allowed(&self) -> bool {
        self.state.controls_allowed()
    }

    fn relay_malfunction(&self) -> bool {
        self.state.relay_malfunction
    }
}
