//! # offboard-flight
//! Offboard velocity control for multi-copters.
//!
//! [`FlightModeController`] follows the vehicle's flight mode:
//! in position hold it streams a hover setpoint, on entering offboard mode it executes
//! its [`Maneuver`]s one after another, and in manual mode it stops streaming.
//!
//! [`frame`] contains the reference frames and the [`FrameTransformer`] used to express
//! maneuver velocities in the local ENU frame.
//!
//! [`streamer`] contains the [`SetpointStreamer`] that publishes setpoints at a fixed rate,
//! never exceeding the maximum speed.
//!
//! [`limiter`] contains the single-axis [`CommandLimiter`](limiter::CommandLimiter)
//! for forwarding raw velocity commands.
//!
//! ```no_run
//! use offboard_flight::{maneuver::paths, FlightMode, FlightModeController};
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), offboard_flight::Error> {
//! let (tx, mut setpoints) = mpsc::unbounded_channel();
//!
//! let controller = FlightModeController::builder()
//!     .sink(tx)
//!     .max_speed(0.5)
//!     .maneuvers(paths::square(0.2, Duration::from_secs(5)))
//!     .build()?;
//!
//! controller.handle_mode(FlightMode::from("POSCTL")).await;
//! controller.handle_mode(FlightMode::from("OFFBOARD")).await;
//!
//! while let Some(velocity) = setpoints.recv().await {
//!     println!("{velocity:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub use config::Config;

pub mod controller;
pub use controller::{FlightModeController, Pose};

mod error;
pub use error::Error;

pub mod frame;
pub use frame::{FrameId, FrameTransformer, StaticTransforms};

pub mod limiter;

pub mod maneuver;
pub use maneuver::Maneuver;

pub mod mode;
pub use mode::FlightMode;

mod rate;
pub use rate::Rate;

pub mod streamer;
pub use streamer::{clamp_speed, SetpointSink, SetpointSlot, SetpointStreamer};
