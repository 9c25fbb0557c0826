//! # Vehicle Safety Hooks
//!
//! This library implements the safety layer that sits between an external
//! controls computer and a vehicle's CAN buses.
//!
//! ## Overview
//!
//! Every frame passes through one of three hooks:
//! - `on_receive`: validates inbound frames and updates the controls state
//!   (cruise engagement, driver torque, wheel speed, pedals)
//! - `on_transmit`: decides whether an outbound frame may reach the bus,
//!   enforcing absolute, per-message and real-time torque limits on steering
//! - `on_forward`: decides which bus, if any, a frame is relayed to
//!
//! Actuation is only permitted while "controls allowed" is set, which
//! happens on the rising edge of cruise engagement and ends as soon as
//! cruise drops, the driver touches a pedal, or a required message goes stale.
//!
//! ## Example
//!
//! ```rust
//! use vehicle_safety_hooks::{CanFrame, SafetyHooks};
//! use vehicle_safety_hooks::platforms::subaru_legacy::{SubaruLegacy, SubaruLegacyConfig};
//!
//! # fn main() -> vehicle_safety_hooks::SafetyResult<()> {
//! let mut hooks: SubaruLegacy = SubaruLegacy::new(SubaruLegacyConfig::default())?;
//! hooks.initialize(0);
//!
//! // cruise engaged: rising edge allows controls
//! let mut cruise = [0u8; 8];
//! cruise[6] = 0x02;
//! hooks.on_receive(&CanFrame::from_bytes(0x144, 0, cruise));
//! assert!(hooks.controls_allowed());
//!
//! // zero torque steering command is allowed onto the vehicle bus
//! assert!(hooks.on_transmit(&CanFrame::from_bytes(0x164, 0, [0; 8])));
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Hooks take `&mut self` and run to completion in bounded time without
//! allocating. If receive and transmit run in different interrupt contexts,
//! guard the whole hooks object with one lock.

use thiserror::Error;

pub mod common;
pub mod platforms;
pub mod state;

pub use common::addr_check::{AddrCheck, AddrCheckTable};
pub use common::clock::{ManualClock, MicrosecondClock, MonotonicClock};
pub use common::frame::{CanFrame, CanMsg};
pub use state::{SafetyState, TxVerdict};

/// Result type for safety configuration and frame construction
pub type SafetyResult<T> = Result<T, SafetyError>;

/// Safety error types
///
/// Hooks never return errors; these only come from building frames and
/// platform configurations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SafetyError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid frame contents
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

/// Main trait for vehicle platform safety hooks
///
/// The external dispatch loop calls `initialize` once, then offers every
/// frame to the matching hook. Each hook returns a definite verdict for any
/// input.
pub trait SafetyHooks {
    /// Configuration type for this platform
    type Config;

    /// Create a new instance with the given configuration
    ///
    /// # Errors
    /// Returns `SafetyError::InvalidConfiguration` if the configuration is invalid
    fn new(config: Self::Config) -> SafetyResult<Self>
    where
        Self: Sized;

    /// Reset all state and return the table of messages to monitor
    ///
    /// `param` is the opaque 16-bit safety parameter; each platform defines
    /// its own flags. Calling this again forces a full reset.
    fn initialize(&mut self, param: u16) -> &AddrCheckTable;

    /// Validate a received frame and update state from it
    ///
    /// Returns `false` if the frame failed address validation, in which case
    /// no state was updated.
    fn on_receive(&mut self, frame: &CanFrame) -> bool;

    /// Decide whether a frame may be transmitted
    fn on_transmit(&mut self, frame: &CanFrame) -> bool;

    /// Decide whether a LIN frame may be transmitted
    fn on_transmit_lin(&mut self, _lin_num: u8, _data: &[u8]) -> bool {
        false
    }

    /// Destination bus for a frame received on `bus`, or `None` to drop it
    fn on_forward(&self, bus: u8, frame: &CanFrame) -> Option<u8>;

    /// 1 Hz housekeeping: message freshness and relay detection settling
    fn tick(&mut self);

    /// Whether actuation is currently permitted
    fn controls_allowed(&self) -> bool;

    /// Whether the bus isolation relay has been found faulty
    fn relay_malfunction(&self) -> bool;
}
