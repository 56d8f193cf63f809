//! Forwarding of raw velocity commands, limited to slow forward motion.

use crate::streamer::SetpointSink;
use log::debug;
use nalgebra::Vector3;
use std::sync::Mutex;

/// Default forward command limit (in m/s).
pub const VELOCITY_COMMAND_LIMIT: f32 = 0.09;

/// Limits a velocity command to its forward component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandLimiter {
    limit: f32,
}

impl Default for CommandLimiter {
    fn default() -> Self {
        Self::new(VELOCITY_COMMAND_LIMIT)
    }
}

impl CommandLimiter {
    pub fn new(limit: f32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    /// Clamp the x component of `command` to `[-limit, limit]` and zero the rest.
    pub fn apply(&self, command: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(command.x.max(-self.limit).min(self.limit), 0., 0.)
    }
}

/// Landed state reported by the vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LandedState {
    #[default]
    Undefined,
    OnGround,
    InAir,
    Takeoff,
    Landing,
}

/// Forwards limited velocity commands to a sink and tracks whether the vehicle has landed.
pub struct Dispatcher<K> {
    limiter: CommandLimiter,
    sink: K,
    landed_state: Mutex<LandedState>,
}

impl<K: SetpointSink> Dispatcher<K> {
    pub fn new(sink: K) -> Self {
        Self::with_limiter(sink, CommandLimiter::default())
    }

    pub fn with_limiter(sink: K, limiter: CommandLimiter) -> Self {
        Self {
            limiter,
            sink,
            landed_state: Mutex::new(LandedState::Undefined),
        }
    }

    /// Limit `command` and publish it.
    pub fn handle_command(&self, command: Vector3<f32>) {
        let limited = self.limiter.apply(command);
        if limited != command {
            debug!("Command {:?} limited to {:?}", command, limited);
        }
        self.sink.publish(limited);
    }

    pub fn handle_landed_state(&self, state: LandedState) {
        *self
            .landed_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Returns `None` if the landed state is unknown.
    pub fn landed(&self) -> Option<bool> {
        let state = *self
            .landed_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match state {
            LandedState::Undefined => None,
            LandedState::OnGround => Some(true),
            LandedState::InAir | LandedState::Takeoff | LandedState::Landing => Some(false),
        }
    }
}
