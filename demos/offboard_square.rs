use nalgebra::{UnitQuaternion, Vector3};
use offboard_flight::{
    maneuver::paths, FlightMode, FlightModeController, FrameId, Pose, SetpointSink,
};
use std::time::{Duration, Instant};

struct PrintSink {
    start: Instant,
}

impl SetpointSink for PrintSink {
    fn publish(&self, velocity: Vector3<f32>) {
        println!(
            "{:>6.2}s  vx={:+.3} vy={:+.3} vz={:+.3}",
            self.start.elapsed().as_secs_f32(),
            velocity.x,
            velocity.y,
            velocity.z
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), offboard_flight::Error> {
    let maneuvers = paths::square(0.2, Duration::from_secs(2))
        .into_iter()
        .map(|maneuver| maneuver.in_frame(FrameId::BodyUp));

    let controller = FlightModeController::builder()
        .sink(PrintSink {
            start: Instant::now(),
        })
        .maneuvers(maneuvers)
        .build()?;

    // Vehicle yawed 45 degrees to the left of east
    let orientation = UnitQuaternion::from_euler_angles(0., 0., core::f32::consts::FRAC_PI_4);
    controller.handle_pose(&Pose::new(Vector3::zeros(), orientation));

    controller.handle_mode(FlightMode::from("POSCTL")).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    controller.handle_mode(FlightMode::from("OFFBOARD")).await;
    controller.maneuvers_done().await;

    controller.handle_mode(FlightMode::from("MANUAL")).await;
    controller.shutdown().await;

    Ok(())
}
