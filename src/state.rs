//! Mutable safety state shared by a platform's hooks.
//!
//! All of it lives in one [`SafetyState`] owned by the hooks object, so a
//! target with several interrupt contexts can guard it with a single lock.

use crate::common::limits::{
    driver_limit_check, max_limit_check, rt_rate_limit_check, ts_elapsed, SteerLimits,
};
use crate::common::sample::TorqueSample;
use tracing::{info, warn};

/// Housekeeping ticks after initialization before a stock ECU message on
/// the vehicle bus is treated as a relay malfunction.
pub const RELAY_TRNS_TIMEOUT: u32 = 1;

/// Cruise engagement edge and the global actuation permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlsState {
    pub controls_allowed: bool,
    pub cruise_engaged_prev: bool,
}

impl ControlsState {
    /// Enter controls on the rising edge of cruise, exit whenever cruise is off.
    pub fn update_cruise(&mut self, cruise_engaged: bool) {
        if cruise_engaged && !self.cruise_engaged_prev && !self.controls_allowed {
            info!("Controls allowed on cruise engage");
            self.controls_allowed = true;
        }
        if !cruise_engaged {
            self.disallow("cruise disengaged");
        }
        self.cruise_engaged_prev = cruise_engaged;
    }

    pub fn disallow(&mut self, reason: &'static str) {
        if self.controls_allowed {
            info!(reason, "Controls disallowed");
        }
        self.controls_allowed = false;
    }
}

/// Flags derived from wheel speed and pedal messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleMotionState {
    pub vehicle_moving: bool,
    pub brake_pressed: bool,
    pub gas_pressed: bool,
    pub brake_pressed_prev: bool,
    pub gas_pressed_prev: bool,
}

/// Which torque checks a command failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TorqueViolation {
    pub max_limit: bool,
    pub driver_rate: bool,
    pub realtime_rate: bool,
    pub controls_not_allowed: bool,
}

impl TorqueViolation {
    pub fn any(&self) -> bool {
        self.max_limit || self.driver_rate || self.realtime_rate || self.controls_not_allowed
    }
}

/// Result of evaluating one steering command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVerdict {
    Allowed,
    Blocked(TorqueViolation),
}

impl TxVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TxVerdict::Allowed)
    }
}

/// Torque limiter bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Last command seen while controls were allowed
    pub desired_torque_last: i32,
    /// Anchor of the current real-time window
    pub rt_torque_last: i32,
    /// Start of the current real-time window, in microseconds
    pub ts_last: u32,
}

impl RateLimiterState {
    /// Zero torque, with a real-time window starting at `now_us`.
    pub fn neutral(now_us: u32) -> Self {
        Self {
            desired_torque_last: 0,
            rt_torque_last: 0,
            ts_last: now_us,
        }
    }

    /// Check a desired torque against all limits.
    ///
    /// Returns the verdict and the limiter state to carry into the next
    /// command. The returned state must be kept even when the frame is
    /// rejected for some other reason, or the real-time window drifts.
    pub fn evaluate(
        &self,
        limits: &SteerLimits,
        desired_torque: i32,
        now_us: u32,
        controls_allowed: bool,
        torque_driver: &TorqueSample,
    ) -> (TxVerdict, RateLimiterState) {
        let mut next = *self;
        let mut violation = TorqueViolation::default();

        if controls_allowed {
            violation.max_limit =
                max_limit_check(desired_torque, limits.max_steer, -limits.max_steer);
            violation.driver_rate =
                driver_limit_check(desired_torque, self.desired_torque_last, torque_driver, limits);
            next.desired_torque_last = desired_torque;

            violation.realtime_rate =
                rt_rate_limit_check(desired_torque, self.rt_torque_last, limits.max_rt_delta);

            if ts_elapsed(now_us, self.ts_last) > limits.rt_interval_us {
                next.rt_torque_last = desired_torque;
                next.ts_last = now_us;
            }
        } else if desired_torque != 0 {
            violation.controls_not_allowed = true;
        }

        if violation.any() || !controls_allowed {
            next = Self::neutral(now_us);
        }

        let verdict = if violation.any() {
            TxVerdict::Blocked(violation)
        } else {
            TxVerdict::Allowed
        };
        (verdict, next)
    }
}

/// Everything the hooks of one platform remember between frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyState {
    pub controls: ControlsState,
    pub motion: VehicleMotionState,
    pub torque_driver: TorqueSample,
    pub limiter: RateLimiterState,
    pub relay_malfunction: bool,
    /// Saturating count of housekeeping ticks since initialization
    pub mode_ticks: u32,
}

impl SafetyState {
    pub fn controls_allowed(&self) -> bool {
        self.controls.controls_allowed
    }

    /// Return to power-on state with the limiter window anchored at `now_us`.
    pub fn reset(&mut self, now_us: u32) {
        *self = Self {
            limiter: RateLimiterState::neutral(now_us),
            ..Self::default()
        };
    }

    /// Latch the relay malfunction. Only a reset clears it.
    pub fn set_relay_malfunction(&mut self) {
        if !self.relay_malfunction {
            warn!("Relay malfunction detected, blocking all tx and forwarding");
        }
        self.relay_malfunction = true;
    }

    /// Checks shared by every platform, run after each valid vehicle bus frame.
    pub fn generic_rx_checks(&mut self, stock_ecu_detected: bool) {
        let motion = &mut self.motion;

        if motion.gas_pressed && !motion.gas_pressed_prev {
            self.controls.disallow("gas pressed");
        }
        motion.gas_pressed_prev = motion.gas_pressed;

        // a held brake only disengages once the car moves
        if motion.brake_pressed && (!motion.brake_pressed_prev || motion.vehicle_moving) {
            self.controls.disallow("brake pressed");
        }
        motion.brake_pressed_prev = motion.brake_pressed;

        if stock_ecu_detected && self.mode_ticks > RELAY_TRNS_TIMEOUT {
            self.set_relay_malfunction();
        }
    }
}
