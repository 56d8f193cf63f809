//! Continuous, speed-limited publishing of velocity setpoints.

use crate::Rate;
use log::{debug, error, warn};
use nalgebra::Vector3;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Destination for published velocity setpoints (in m/s, local ENU).
pub trait SetpointSink: Send + Sync + 'static {
    fn publish(&self, velocity: Vector3<f32>);
}

impl SetpointSink for mpsc::UnboundedSender<Vector3<f32>> {
    fn publish(&self, velocity: Vector3<f32>) {
        if self.send(velocity).is_err() {
            debug!("Setpoint receiver dropped");
        }
    }
}

impl<S: SetpointSink + ?Sized> SetpointSink for Arc<S> {
    fn publish(&self, velocity: Vector3<f32>) {
        (**self).publish(velocity)
    }
}

/// The commanded velocity setpoint shared between the controller and the streamer.
#[derive(Clone, Debug)]
pub struct SetpointSlot {
    velocity: Arc<Mutex<Vector3<f32>>>,
}

impl Default for SetpointSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SetpointSlot {
    /// Create a new slot holding zero velocity.
    pub fn new() -> Self {
        Self {
            velocity: Arc::new(Mutex::new(Vector3::zeros())),
        }
    }

    pub fn get(&self) -> Vector3<f32> {
        *self.lock()
    }

    pub fn set(&self, velocity: Vector3<f32>) {
        *self.lock() = velocity;
    }

    /// Set the slot to zero velocity (hover).
    pub fn reset(&self) {
        self.set(Vector3::zeros());
    }

    fn lock(&self) -> MutexGuard<'_, Vector3<f32>> {
        self.velocity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Limit the magnitude of `velocity` to `max_speed`, preserving its direction.
///
/// Velocities within the limit are returned unchanged.
/// Non-finite velocities, and any velocity limited by a `max_speed`
/// that is not positive and finite, are replaced with zero.
pub fn clamp_speed(velocity: Vector3<f32>, max_speed: f32) -> Vector3<f32> {
    if !(max_speed > 0. && max_speed.is_finite()) || !velocity.iter().all(|v| v.is_finite()) {
        return Vector3::zeros();
    }

    let speed = velocity.norm();
    if speed <= max_speed {
        return velocity;
    }

    let limited = velocity * (max_speed / speed);
    if limited.norm() <= max_speed {
        return limited;
    }

    // Rounding left the scaled norm a few ulps above the limit
    let limited = limited * (1. - 8. * f32::EPSILON);
    if limited.norm() <= max_speed {
        limited
    } else {
        Vector3::zeros()
    }
}

struct Stream {
    enabled: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Publishes the contents of a [`SetpointSlot`] to a [`SetpointSink`] at a fixed rate.
///
/// Every published setpoint has a norm of at most `max_speed`.
pub struct SetpointStreamer<K> {
    slot: SetpointSlot,
    sink: Arc<K>,
    rate: Rate,
    max_speed: f32,
    stream: tokio::sync::Mutex<Option<Stream>>,
}

impl<K: SetpointSink> SetpointStreamer<K> {
    /// Create a stopped streamer.
    /// A `max_speed` that is not positive and finite limits every setpoint to zero.
    pub fn new(slot: SetpointSlot, sink: Arc<K>, rate: Rate, max_speed: f32) -> Self {
        if !(max_speed > 0. && max_speed.is_finite()) {
            warn!("Invalid max speed {}, only zero velocity will be published", max_speed);
        }

        Self {
            slot,
            sink,
            rate,
            max_speed,
            stream: tokio::sync::Mutex::new(None),
        }
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub async fn is_running(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Spawn the streaming task. Does nothing if it is already running.
    pub async fn start(&self) {
        let mut stream = self.stream.lock().await;
        if stream.is_some() {
            debug!("Setpoint stream already running");
            return;
        }

        let (enabled, rx) = watch::channel(true);
        let handle = tokio::spawn(run(
            self.slot.clone(),
            self.sink.clone(),
            self.rate,
            self.max_speed,
            rx,
        ));
        *stream = Some(Stream { enabled, handle });
    }

    /// Stop the streaming task and wait for it to exit.
    /// Nothing is published after this returns. Does nothing if the task is not running.
    pub async fn stop(&self) {
        let mut stream = self.stream.lock().await;
        let Some(Stream { enabled, handle }) = stream.take() else {
            debug!("Setpoint stream already stopped");
            return;
        };

        enabled.send_replace(false);
        if let Err(join_error) = handle.await {
            error!("Setpoint stream failed: {}", join_error);
        }
    }
}

async fn run<K: SetpointSink>(
    slot: SetpointSlot,
    sink: Arc<K>,
    rate: Rate,
    max_speed: f32,
    mut enabled: watch::Receiver<bool>,
) {
    let mut interval = rate.interval();

    loop {
        tokio::select! {
            biased;

            changed = enabled.changed() => {
                if changed.is_err() || !*enabled.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let setpoint = slot.get();
                let limited = clamp_speed(setpoint, max_speed);

                if limited != setpoint {
                    if !setpoint.iter().all(|v| v.is_finite()) {
                        warn!("Non-finite setpoint {:?} replaced with zero", setpoint);
                    } else {
                        debug!("Setpoint {:?} limited to {:?}", setpoint, limited);
                    }
                }

                sink.publish(limited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time;

    fn streamer(
        max_speed: f32,
    ) -> (
        SetpointStreamer<mpsc::UnboundedSender<Vector3<f32>>>,
        SetpointSlot,
        mpsc::UnboundedReceiver<Vector3<f32>>,
    ) {
        let slot = SetpointSlot::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let streamer =
            SetpointStreamer::new(slot.clone(), Arc::new(tx), Rate::default(), max_speed);
        (streamer, slot, rx)
    }

    #[test]
    fn clamp_never_exceeds_max_speed() {
        let max_speed = 0.5;

        for i in 0..2000 {
            let i = i as f32;
            let velocity = Vector3::new(
                (i * 0.37).sin() * (i * 0.011),
                (i * 1.13).cos() * (i * 0.007),
                (i * 0.71).sin() * 3.,
            );
            let limited = clamp_speed(velocity, max_speed);

            assert!(limited.norm() <= max_speed);
            if velocity.norm() <= max_speed {
                assert_eq!(limited, velocity);
            } else {
                assert_relative_eq!(limited.normalize(), velocity.normalize(), epsilon = 1e-5);
                assert_relative_eq!(limited.norm(), max_speed, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn clamp_non_finite() {
        assert_eq!(
            clamp_speed(Vector3::new(f32::NAN, 0., 0.), 0.5),
            Vector3::zeros()
        );
        assert_eq!(
            clamp_speed(Vector3::new(0., f32::INFINITY, 0.), 0.5),
            Vector3::zeros()
        );
    }

    #[test]
    fn clamp_invalid_limit() {
        let velocity = Vector3::new(1., 0., 0.);

        for max_speed in [-0.5, 0., f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(clamp_speed(velocity, max_speed), Vector3::zeros());
        }
        assert_eq!(clamp_speed(Vector3::zeros(), -0.5), Vector3::zeros());
    }

    #[test]
    fn clamp_tiny_limits() {
        let velocity = Vector3::new(3., -4., 12.);

        for max_speed in [f32::MIN_POSITIVE, 1e-30, 1e-7, 0.1, 0.999_999_9, 1e20] {
            assert!(clamp_speed(velocity, max_speed).norm() <= max_speed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_zero_with_invalid_limit() {
        let (streamer, slot, mut rx) = streamer(-1.);
        slot.set(Vector3::new(0.1, 0.2, 0.));

        streamer.start().await;
        time::sleep(Duration::from_millis(150)).await;
        streamer.stop().await;

        assert_eq!(rx.try_recv(), Ok(Vector3::zeros()));
        assert_eq!(rx.try_recv(), Ok(Vector3::zeros()));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_limited_setpoints() {
        let (streamer, slot, mut rx) = streamer(0.5);
        slot.set(Vector3::new(3., 4., 0.));

        streamer.start().await;
        time::sleep(Duration::from_millis(250)).await;
        streamer.stop().await;

        let mut count = 0;
        while let Ok(velocity) = rx.try_recv() {
            assert_relative_eq!(velocity, Vector3::new(0.3, 0.4, 0.), epsilon = 1e-6);
            assert!(velocity.norm() <= 0.5);
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_published_after_stop() {
        let (streamer, slot, mut rx) = streamer(0.5);
        slot.set(Vector3::new(0.1, 0., 0.));

        streamer.start().await;
        time::sleep(Duration::from_millis(450)).await;
        streamer.stop().await;
        assert!(!streamer.is_running().await);

        while rx.try_recv().is_ok() {}
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_returns_immediately() {
        let (streamer, _slot, _rx) = streamer(0.5);

        // Not started
        streamer.stop().await;

        streamer.start().await;
        time::sleep(Duration::from_millis(10)).await;

        let before = time::Instant::now();
        streamer.stop().await;
        streamer.stop().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_runs_one_stream() {
        let (streamer, _slot, mut rx) = streamer(0.5);

        streamer.start().await;
        streamer.start().await;
        assert!(streamer.is_running().await);

        time::sleep(Duration::from_millis(950)).await;
        streamer.stop().await;

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 10);
    }
}
