use crate::frame::FrameId;

/// Errors raised by the offboard controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("No static transform exists from {from} to {to}")]
    UnknownFrameTransform { from: FrameId, to: FrameId },

    #[error("No orientation available to transform from {from} to {to}")]
    OrientationUnavailable { from: FrameId, to: FrameId },

    #[error("Unknown frame: {0}")]
    UnknownFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Controller requires a setpoint sink")]
    MissingSink,
}
