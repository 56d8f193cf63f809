//! Flight mode driven offboard control.
//!
//! The [`FlightModeController`] streams setpoints while the vehicle is in position hold,
//! executes its maneuvers on entering offboard mode,
//! and relinquishes control in manual mode.

use crate::maneuver::{Maneuver, Sample};
use crate::mode::ModeState;
use crate::streamer::{SetpointSink, SetpointSlot, SetpointStreamer};
use crate::{Config, FlightMode, FrameId, FrameTransformer, Rate};
use log::{debug, error, info, warn};
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

mod builder;
pub use builder::Builder;

/// A pose observation of the vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Position in the local ENU frame (in meters).
    pub position: Vector3<f32>,

    /// Rotation from the body-up frame to the local ENU frame.
    pub orientation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

#[derive(Debug, Default)]
struct VehicleState {
    mode: ModeState,
    orientation: Option<UnitQuaternion<f32>>,

    /// Count of fresh entries into offboard mode, identifying the current maneuver run.
    offboard_entries: u64,

    is_shutting_down: bool,
}

impl VehicleState {
    fn may_execute(&self, run: u64) -> bool {
        !self.is_shutting_down
            && self.mode.current == FlightMode::Offboard
            && self.offboard_entries == run
    }
}

/// Runs the configured maneuvers, writing transformed samples to the setpoint slot.
#[derive(Clone)]
struct Executor {
    vehicle: Arc<Mutex<VehicleState>>,
    slot: SetpointSlot,
    transformer: FrameTransformer,
    maneuvers: Arc<[Maneuver]>,
    rate: Rate,
}

impl Executor {
    fn vehicle(&self) -> MutexGuard<'_, VehicleState> {
        self.vehicle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self, run: u64) {
        let count = self.maneuvers.len();

        for (index, maneuver) in self.maneuvers.iter().enumerate() {
            info!(
                "Executing maneuver {}/{}: {:?} in {}",
                index + 1,
                count,
                maneuver.profile(),
                maneuver.frame()
            );

            if !self.execute(maneuver, run).await {
                warn!(
                    "Maneuver {}/{} aborted, skipping the remaining {}",
                    index + 1,
                    count,
                    count - index - 1
                );
                return;
            }
        }

        info!("All {} maneuvers complete", count);
    }

    /// Execute a single maneuver, returning `false` if it was aborted.
    async fn execute(&self, maneuver: &Maneuver, run: u64) -> bool {
        self.hover(run);
        let mut samples = maneuver.samples(self.rate);

        let mut is_complete = true;
        while let Some(sample) = samples.next().await {
            if !self.apply(maneuver.frame(), sample, run) {
                is_complete = false;
                break;
            }
        }

        self.hover(run);
        is_complete
    }

    /// Reset the setpoint slot unless a newer run has taken over.
    fn hover(&self, run: u64) {
        let vehicle = self.vehicle();
        if vehicle.offboard_entries == run {
            self.slot.reset();
        }
    }

    /// Write a sample to the setpoint slot, returning `false` if execution must stop.
    /// Samples that can't be transformed are dropped.
    fn apply(&self, frame: FrameId, sample: Sample, run: u64) -> bool {
        let vehicle = self.vehicle();
        if !vehicle.may_execute(run) {
            return false;
        }

        match self
            .transformer
            .to_local_enu(sample.velocity, frame, vehicle.orientation.as_ref())
        {
            Ok(velocity) => self.slot.set(velocity),
            Err(error) => warn!("Dropping sample at {:?}: {}", sample.elapsed, error),
        }

        true
    }
}

/// Offboard velocity controller driven by the vehicle's flight mode.
pub struct FlightModeController<K> {
    config: Config,
    executor: Executor,
    streamer: SetpointStreamer<K>,
    run: Mutex<Option<JoinHandle<()>>>,

    /// Held across a mode update and the streamer action it triggers.
    transition: tokio::sync::Mutex<()>,
}

impl<K: SetpointSink> FlightModeController<K> {
    pub fn builder() -> Builder<K> {
        Builder::default()
    }

    pub(crate) fn new(
        config: Config,
        sink: Arc<K>,
        maneuvers: Arc<[Maneuver]>,
        transformer: FrameTransformer,
    ) -> Self {
        let slot = SetpointSlot::new();
        let streamer = SetpointStreamer::new(slot.clone(), sink, config.rate(), config.max_speed);

        Self {
            executor: Executor {
                vehicle: Arc::default(),
                slot,
                transformer,
                maneuvers,
                rate: config.rate(),
            },
            config,
            streamer,
            run: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn maneuvers(&self) -> &[Maneuver] {
        &self.executor.maneuvers
    }

    pub fn mode(&self) -> FlightMode {
        self.executor.vehicle().mode.current
    }

    pub fn previous_mode(&self) -> FlightMode {
        self.executor.vehicle().mode.previous
    }

    /// The latest orientation, or `None` before the first pose.
    pub fn orientation(&self) -> Option<UnitQuaternion<f32>> {
        self.executor.vehicle().orientation
    }

    /// The current commanded velocity in the local ENU frame, before speed limiting.
    pub fn setpoint(&self) -> Vector3<f32> {
        self.executor.slot.get()
    }

    pub async fn is_streaming(&self) -> bool {
        self.streamer.is_running().await
    }

    /// Command zero velocity.
    pub fn hover(&self) {
        self.executor.slot.reset();
    }

    /// Update the vehicle orientation from a pose observation.
    pub fn handle_pose(&self, pose: &Pose) {
        self.executor.vehicle().orientation = Some(pose.orientation);
    }

    /// Apply a flight mode update.
    ///
    /// Maneuvers are executed on a spawned task, so this returns
    /// once the streamer has been started or stopped.
    /// Concurrent updates are applied one at a time, in lock order.
    pub async fn handle_mode(&self, mode: FlightMode) {
        let _transition = self.transition.lock().await;

        let (state, run, is_shutting_down) = {
            let mut vehicle = self.executor.vehicle();
            vehicle.mode.update(mode);

            if vehicle.mode.entered(FlightMode::PositionHold) {
                self.executor.slot.reset();
            }

            let run = if vehicle.mode.entered(FlightMode::Offboard) {
                vehicle.offboard_entries += 1;
                Some(vehicle.offboard_entries)
            } else {
                None
            };

            (vehicle.mode, run, vehicle.is_shutting_down)
        };

        debug!("Flight mode {} -> {}", state.previous, state.current);
        if is_shutting_down {
            return;
        }

        match state.current {
            FlightMode::Manual => {
                if self.streamer.is_running().await {
                    info!("Setpoint stream DISABLED");
                    self.streamer.stop().await;
                }
            }
            FlightMode::PositionHold => {
                if !self.streamer.is_running().await {
                    info!("Setpoint stream ENABLED");
                    self.streamer.start().await;
                }
            }
            FlightMode::Offboard => {
                if let Some(run) = run {
                    info!("Entering OFFBOARD mode");
                    self.spawn_run(run);
                }
            }
            FlightMode::Unknown => {}
        }
    }

    fn spawn_run(&self, run: u64) {
        let handle = tokio::spawn(self.executor.clone().run(run));

        // A superseded run stops at its next sample
        *self.lock_run() = Some(handle);
    }

    /// Wait for the current maneuver run to complete or abort.
    pub async fn maneuvers_done(&self) {
        let handle = self.lock_run().take();

        if let Some(handle) = handle {
            if let Err(join_error) = handle.await {
                error!("Maneuver execution failed: {}", join_error);
            }
        }
    }

    /// Abort any running maneuvers and stop streaming.
    /// Later mode updates are tracked but trigger no action.
    pub async fn shutdown(&self) {
        let _transition = self.transition.lock().await;
        self.executor.vehicle().is_shutting_down = true;

        self.maneuvers_done().await;
        self.streamer.stop().await;
        info!("Offboard controller shut down");
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
