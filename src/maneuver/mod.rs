//! Time-parameterized velocity profiles.
//!
//! A [`Maneuver`] describes a velocity over time expressed in some [`FrameId`].
//! Its [`Samples`] pull one velocity per tick of a [`Rate`],
//! waiting for each sampling instant before yielding.

use crate::{FrameId, Rate};
use core::fmt;
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval};

pub mod paths;

/// A velocity as a function of elapsed time in seconds.
pub type VelocityFn = Arc<dyn Fn(f32) -> Vector3<f32> + Send + Sync>;

/// The shape of a maneuver's velocity over time.
#[derive(Clone)]
pub enum Profile {
    /// Hold a fixed velocity.
    Constant(Vector3<f32>),

    /// Move by a displacement, starting and ending at rest.
    Line(Vector3<f32>),

    /// Follow an arbitrary velocity function.
    Parametric(VelocityFn),
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Constant(velocity) => f.debug_tuple("Constant").field(velocity).finish(),
            Profile::Line(displacement) => f.debug_tuple("Line").field(displacement).finish(),
            Profile::Parametric(_) => f.write_str("Parametric(..)"),
        }
    }
}

/// A frame-tagged velocity profile.
///
/// Maneuvers are expressed in the forward camera frame unless
/// another frame is set with [`Maneuver::in_frame`].
#[derive(Clone, Debug)]
pub struct Maneuver {
    frame: FrameId,
    duration: Option<Duration>,
    profile: Profile,
}

impl Maneuver {
    fn new(profile: Profile, duration: Option<Duration>) -> Self {
        Self {
            frame: FrameId::ForwardCamera,
            duration,
            profile,
        }
    }

    /// Hold `velocity` (in m/s) for `duration`.
    pub fn constant(velocity: Vector3<f32>, duration: Duration) -> Self {
        Self::new(Profile::Constant(velocity), Some(duration))
    }

    /// Hold `velocity` (in m/s) until the maneuver is aborted.
    pub fn hold(velocity: Vector3<f32>) -> Self {
        Self::new(Profile::Constant(velocity), None)
    }

    /// Move by `displacement` (in meters) over `duration` with a parabolic velocity profile.
    pub fn line(displacement: Vector3<f32>, duration: Duration) -> Self {
        Self::new(Profile::Line(displacement), Some(duration))
    }

    /// Follow the velocity function `f` for elapsed times in `[0, domain)`.
    pub fn parametric<F>(f: F, domain: Duration) -> Self
    where
        F: Fn(f32) -> Vector3<f32> + Send + Sync + 'static,
    {
        Self::new(Profile::Parametric(Arc::new(f)), Some(domain))
    }

    /// Builder method to set the frame the velocities are expressed in.
    pub fn in_frame(mut self, frame: FrameId) -> Self {
        self.frame = frame;
        self
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// How long this maneuver runs, or `None` if it only ends when aborted.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// The domain of a parametric maneuver. This is the same field as [`Maneuver::duration`].
    pub fn domain(&self) -> Option<Duration> {
        self.duration
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Calculate the velocity at `t` seconds after the start of the maneuver.
    pub fn velocity_at(&self, t: f32) -> Vector3<f32> {
        match &self.profile {
            Profile::Constant(velocity) => *velocity,
            Profile::Line(displacement) => {
                let Some(duration) = self.duration else {
                    return Vector3::zeros();
                };
                let end = duration.as_secs_f32();
                displacement.map(|d| -6. * d / end.powi(3) * (t * (t - end)))
            }
            Profile::Parametric(f) => f(t),
        }
    }

    /// Start sampling this maneuver at `rate`.
    /// Time is measured from the first call to [`Samples::next`].
    pub fn samples(&self, rate: Rate) -> Samples<'_> {
        Samples {
            maneuver: self,
            rate,
            clock: None,
            is_done: false,
        }
    }
}

/// A velocity sampled from a maneuver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub velocity: Vector3<f32>,

    /// Time since the first sample.
    pub elapsed: Duration,
}

/// Rate-paced, single-use samples of a [`Maneuver`].
pub struct Samples<'a> {
    maneuver: &'a Maneuver,
    rate: Rate,
    clock: Option<(Instant, Interval)>,
    is_done: bool,
}

impl Samples<'_> {
    /// Wait for the next sampling instant and return the velocity at that time.
    /// Returns `None` once the maneuver's duration has elapsed.
    pub async fn next(&mut self) -> Option<Sample> {
        if self.is_done {
            return None;
        }

        let start = match &mut self.clock {
            Some((start, interval)) => {
                interval.tick().await;
                *start
            }
            None => {
                let mut interval = self.rate.interval();
                interval.tick().await;

                let start = Instant::now();
                self.clock = Some((start, interval));
                start
            }
        };

        let elapsed = start.elapsed();
        if self.maneuver.duration.map_or(false, |end| elapsed >= end) {
            self.is_done = true;
            return None;
        }

        Some(Sample {
            velocity: self.maneuver.velocity_at(elapsed.as_secs_f32()),
            elapsed,
        })
    }
}
