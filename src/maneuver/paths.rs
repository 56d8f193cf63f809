//! Ready-made maneuvers and velocity paths.

use super::Maneuver;
use core::f32::consts::PI;
use nalgebra::Vector3;
use std::time::Duration;

/// Velocity (in m/s) tracing the Lincoln Labs path.
/// The path closes every 25 seconds.
pub fn lincoln_labs(t: f32) -> Vector3<f32> {
    Vector3::new(
        (4. * PI / 25.) * (8. * PI * t / 25.).cos(),
        (-9. * PI / 50.) * (6. * PI * t / 25.).cos(),
        0.,
    )
}

/// Velocity (in m/s) tracing a moustache.
/// The path closes every 25 seconds.
pub fn moustache(t: f32) -> Vector3<f32> {
    Vector3::new(
        (2. * PI / 25.) * (2. * PI * t / 25.).sin(),
        (2. * PI / 125.) * (4. * (8. * PI * t / 25.).sin() - (2. * PI * t / 25.).cos()),
        0.,
    )
}

/// One loop of the Lincoln Labs path.
pub fn lincoln_labs_maneuver() -> Maneuver {
    Maneuver::parametric(lincoln_labs, Duration::from_secs(25))
}

/// Four loops of the moustache path.
pub fn moustache_maneuver() -> Maneuver {
    Maneuver::parametric(moustache, Duration::from_secs(100))
}

/// A square flown at a constant `speed` (in m/s),
/// spending `side` on each edge and stopping for a second at each corner.
pub fn square(speed: f32, side: Duration) -> Vec<Maneuver> {
    let stop = Maneuver::constant(Vector3::zeros(), Duration::from_secs(1));

    [
        Vector3::new(0., -speed, 0.),
        Vector3::new(speed, 0., 0.),
        Vector3::new(0., speed, 0.),
        Vector3::new(-speed, 0., 0.),
    ]
    .into_iter()
    .flat_map(|velocity| [Maneuver::constant(velocity, side), stop.clone()])
    .collect()
}

/// A square with edges of `length` (in meters),
/// each flown with smooth acceleration over `side`.
pub fn smooth_square(length: f32, side: Duration) -> Vec<Maneuver> {
    [
        Vector3::new(0., -length, 0.),
        Vector3::new(length, 0., 0.),
        Vector3::new(0., length, 0.),
        Vector3::new(-length, 0., 0.),
    ]
    .into_iter()
    .map(|displacement| Maneuver::line(displacement, side))
    .collect()
}
