//! Numeric limit checks shared by all steering platforms.
//!
//! Every check returns `true` on a **violation**, so results can be OR-combined.

use crate::common::sample::TorqueSample;

/// Absolute bound check: `true` if `val` lies outside `[min, max]`.
pub fn max_limit_check(val: i32, max: i32, min: i32) -> bool {
    val > max || val < min
}

/// Steering torque limits for a driver-torque-sensing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteerLimits {
    /// Absolute command bound
    pub max_steer: i32,
    /// Max torque change allowed within one RT interval
    pub max_rt_delta: i32,
    /// Length of the real-time window, in microseconds
    pub rt_interval_us: u32,
    /// Max per-message increase in magnitude
    pub max_rate_up: i32,
    /// Max per-message decrease in magnitude
    pub max_rate_down: i32,
    /// Driver torque tolerated before the command must back off
    pub driver_torque_allowance: i32,
    /// Scale between driver torque and command units
    pub driver_torque_factor: i32,
}

/// Driver-aware rate check.
///
/// The command may grow by at most `max_rate_up` per message away from zero.
/// When the driver pushes against the command harder than the allowance,
/// the ceiling shrinks and the command must move back toward zero, but it
/// may always do so at up to `max_rate_down` per message.
pub fn driver_limit_check(
    val: i32,
    val_last: i32,
    driver: &TorqueSample,
    limits: &SteerLimits,
) -> bool {
    let highest_allowed_rl = val_last.max(0) + limits.max_rate_up;
    let lowest_allowed_rl = val_last.min(0) - limits.max_rate_up;

    let driver_max_limit = limits.max_steer
        + (limits.driver_torque_allowance + driver.max()) * limits.driver_torque_factor;
    let driver_min_limit = -limits.max_steer
        + (-limits.driver_torque_allowance + driver.min()) * limits.driver_torque_factor;

    // past the driver limit the command has to head back toward 0
    let highest_allowed =
        highest_allowed_rl.min((val_last - limits.max_rate_down).max(driver_max_limit.max(0)));
    let lowest_allowed =
        lowest_allowed_rl.max((val_last + limits.max_rate_down).min(driver_min_limit.min(0)));

    val < lowest_allowed || val > highest_allowed
}

/// Real-time delta check against the anchor sampled at the start of the
/// current RT window.
pub fn rt_rate_limit_check(val: i32, val_last: i32, max_rt_delta: i32) -> bool {
    let highest_val = val_last.max(0) + max_rt_delta;
    let lowest_val = val_last.min(0) - max_rt_delta;
    val < lowest_val || val > highest_val
}

/// Microseconds elapsed between two readings of a wrapping u32 clock.
pub fn ts_elapsed(ts: u32, ts_last: u32) -> u32 {
    ts.wrapping_sub(ts_last)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: SteerLimits = SteerLimits {
        max_steer: 2047,
        max_rt_delta: 940,
        rt_interval_us: 250_000,
        max_rate_up: 50,
        max_rate_down: 70,
        driver_torque_allowance: 60,
        driver_torque_factor: 10,
    };

    fn driver(t: i32) -> TorqueSample {
        let mut s = TorqueSample::default();
        s.fill(t);
        s
    }

    #[test]
    fn test_max_limit_check() {
        assert!(!max_limit_check(2047, 2047, -2047));
        assert!(!max_limit_check(-2047, 2047, -2047));
        assert!(max_limit_check(2048, 2047, -2047));
        assert!(max_limit_check(-2048, 2047, -2047));
    }

    #[test]
    fn test_rate_up_from_zero() {
        let d = driver(0);
        assert!(!driver_limit_check(50, 0, &d, &LIMITS));
        assert!(!driver_limit_check(-50, 0, &d, &LIMITS));
        assert!(driver_limit_check(51, 0, &d, &LIMITS));
        assert!(driver_limit_check(-51, 0, &d, &LIMITS));
    }

    #[test]
    fn test_rate_down_is_unbounded_without_driver_torque() {
        let d = driver(0);
        assert!(!driver_limit_check(0, 1000, &d, &LIMITS));
        assert!(!driver_limit_check(-50, 1000, &d, &LIMITS));
    }

    #[test]
    fn test_driver_override_forces_ramp_down() {
        // driver fighting a max right command with a huge torque
        let d = driver(-(2047 / 10 + 60 + 1));
        assert!(!driver_limit_check(2047 - 70, 2047, &d, &LIMITS));
        assert!(!driver_limit_check(0, 2047, &d, &LIMITS));
        assert!(driver_limit_check(2047 - 70 + 1, 2047, &d, &LIMITS));
    }

    #[test]
    fn test_rt_rate_limit_check() {
        assert!(!rt_rate_limit_check(940, 0, 940));
        assert!(rt_rate_limit_check(941, 0, 940));
        assert!(!rt_rate_limit_check(-940, 0, 940));
        assert!(rt_rate_limit_check(-941, 0, 940));
        // anchored away from zero, the window widens toward zero
        assert!(!rt_rate_limit_check(-940, 500, 940));
        assert!(!rt_rate_limit_check(1440, 500, 940));
    }

    #[test]
    fn test_ts_elapsed_wraps() {
        assert_eq!(ts_elapsed(10, 5), 5);
        assert_eq!(ts_elapsed(5, u32::MAX - 4), 10);
    }
}
