//! Reference frames and the transforms between them.
//!
//! Frames fixed relative to each other are related by a [`StaticTransforms`] table
//! populated once at startup. Body-fixed frames are related to the world frames
//! through the vehicle's orientation (the body-up to local-ENU rotation).

use crate::Error;
use core::fmt;
use core::str::FromStr;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A named reference frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameId {
    /// x-forward, y-left, z-up (similar to ENU).
    #[serde(rename = "bu")]
    BodyUp,

    /// x-forward, y-right, z-down (similar to NED).
    #[serde(rename = "bd")]
    BodyDown,

    /// Forward-facing camera.
    #[serde(rename = "fc")]
    ForwardCamera,

    /// Downward-facing camera.
    #[serde(rename = "dc")]
    DownwardCamera,

    /// Local East-North-Up world frame.
    #[serde(rename = "lenu")]
    LocalEnu,

    /// Local North-East-Down world frame.
    #[serde(rename = "lned")]
    LocalNed,
}

impl FrameId {
    pub const COUNT: usize = 6;

    pub const ALL: [FrameId; Self::COUNT] = [
        FrameId::BodyUp,
        FrameId::BodyDown,
        FrameId::ForwardCamera,
        FrameId::DownwardCamera,
        FrameId::LocalEnu,
        FrameId::LocalNed,
    ];

    /// Returns `true` for the local world frames.
    pub fn is_world(self) -> bool {
        matches!(self, FrameId::LocalEnu | FrameId::LocalNed)
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameId::BodyUp => "bu",
            FrameId::BodyDown => "bd",
            FrameId::ForwardCamera => "fc",
            FrameId::DownwardCamera => "dc",
            FrameId::LocalEnu => "lenu",
            FrameId::LocalNed => "lned",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameId::ALL
            .into_iter()
            .find(|frame| frame.name() == s)
            .ok_or_else(|| Error::UnknownFrame(s.into()))
    }
}

/// 180 degree rotation about the x axis.
fn flip_x() -> Rotation3<f32> {
    Rotation3::from_matrix_unchecked(Matrix3::new(
        1., 0., 0., //
        0., -1., 0., //
        0., 0., -1.,
    ))
}

/// Rotation mapping vectors in the forward camera frame to the body-down frame.
fn forward_camera_to_body_down() -> Rotation3<f32> {
    Rotation3::from_matrix_unchecked(Matrix3::new(
        0., 0., 1., //
        1., 0., 0., //
        0., 1., 0.,
    ))
}

/// Rotations between frames with a fixed relative orientation.
///
/// Entry `(a, b)` maps a vector expressed in `a` to its representation in `b`.
#[derive(Clone, Copy, Debug)]
pub struct StaticTransforms {
    rotations: [[Option<Rotation3<f32>>; FrameId::COUNT]; FrameId::COUNT],
}

impl Default for StaticTransforms {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticTransforms {
    pub fn new() -> Self {
        let mut transforms = Self {
            rotations: [[None; FrameId::COUNT]; FrameId::COUNT],
        };

        for frame in FrameId::ALL {
            transforms.insert(frame, frame, Rotation3::identity());
        }

        transforms.insert(FrameId::LocalEnu, FrameId::LocalNed, flip_x());
        transforms.insert(FrameId::BodyUp, FrameId::BodyDown, flip_x());
        transforms.insert(
            FrameId::DownwardCamera,
            FrameId::BodyDown,
            Rotation3::identity(),
        );
        transforms.insert(
            FrameId::ForwardCamera,
            FrameId::BodyDown,
            forward_camera_to_body_down(),
        );

        // Camera frames chained through body-down
        transforms.compose(
            FrameId::DownwardCamera,
            FrameId::BodyDown,
            FrameId::ForwardCamera,
        );
        transforms.compose(FrameId::DownwardCamera, FrameId::BodyDown, FrameId::BodyUp);
        transforms.compose(FrameId::ForwardCamera, FrameId::BodyDown, FrameId::BodyUp);

        transforms
    }

    /// Insert the rotation from `from` to `to` along with its inverse.
    fn insert(&mut self, from: FrameId, to: FrameId, rotation: Rotation3<f32>) {
        self.rotations[from.index()][to.index()] = Some(rotation);
        self.rotations[to.index()][from.index()] = Some(rotation.inverse());
    }

    fn compose(&mut self, from: FrameId, via: FrameId, to: FrameId) {
        if let (Some(first), Some(second)) = (self.rotation(from, via), self.rotation(via, to)) {
            self.insert(from, to, second * first);
        }
    }

    /// Look up the rotation from `from` to `to`, if the frames are fixed relative to each other.
    pub fn rotation(&self, from: FrameId, to: FrameId) -> Option<Rotation3<f32>> {
        self.rotations[from.index()][to.index()]
    }

    /// Transform `v` expressed in `from` into its representation in `to`.
    pub fn transform(
        &self,
        v: Vector3<f32>,
        from: FrameId,
        to: FrameId,
    ) -> Result<Vector3<f32>, Error> {
        if from == to {
            return Ok(v);
        }

        self.rotation(from, to)
            .map(|rotation| rotation * v)
            .ok_or(Error::UnknownFrameTransform { from, to })
    }
}

/// Transforms vectors between any pair of frames,
/// using the vehicle orientation when body and world frames are involved.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameTransformer {
    statics: StaticTransforms,
}

impl FrameTransformer {
    pub fn new(statics: StaticTransforms) -> Self {
        Self { statics }
    }

    pub fn statics(&self) -> &StaticTransforms {
        &self.statics
    }

    /// Transform `v` expressed in `from` into its representation in `to`.
    ///
    /// `orientation` is the rotation from body-up to local-ENU and is only
    /// required when exactly one of the frames is a world frame.
    pub fn transform(
        &self,
        v: Vector3<f32>,
        from: FrameId,
        to: FrameId,
        orientation: Option<&UnitQuaternion<f32>>,
    ) -> Result<Vector3<f32>, Error> {
        if from == to {
            return Ok(v);
        }

        if let Some(rotation) = self.statics.rotation(from, to) {
            return Ok(rotation * v);
        }

        let orientation = orientation.ok_or(Error::OrientationUnavailable { from, to })?;

        if from.is_world() {
            let v_lenu = self.statics.transform(v, from, FrameId::LocalEnu)?;
            let v_bu = orientation.inverse_transform_vector(&v_lenu);
            self.statics.transform(v_bu, FrameId::BodyUp, to)
        } else {
            let v_bu = self.statics.transform(v, from, FrameId::BodyUp)?;
            let v_lenu = orientation.transform_vector(&v_bu);
            self.statics.transform(v_lenu, FrameId::LocalEnu, to)
        }
    }

    /// Transform `v` expressed in `from` into the local ENU frame.
    pub fn to_local_enu(
        &self,
        v: Vector3<f32>,
        from: FrameId,
        orientation: Option<&UnitQuaternion<f32>>,
    ) -> Result<Vector3<f32>, Error> {
        self.transform(v, from, FrameId::LocalEnu, orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f32::consts::FRAC_PI_2;

    fn orientation() -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(0.1, -0.2, 0.7)
    }

    #[test]
    fn identity_for_every_frame() {
        let transformer = FrameTransformer::default();
        let v = Vector3::new(0.3, -1.2, 4.);

        for frame in FrameId::ALL {
            assert_eq!(transformer.transform(v, frame, frame, None), Ok(v));
            assert_eq!(
                transformer.transform(v, frame, frame, Some(&orientation())),
                Ok(v)
            );
        }
    }

    #[test]
    fn static_table_is_consistent() {
        let statics = StaticTransforms::new();

        for a in FrameId::ALL {
            assert_eq!(statics.rotation(a, a), Some(Rotation3::identity()));

            for b in FrameId::ALL {
                if let Some(forward) = statics.rotation(a, b) {
                    let backward = statics.rotation(b, a).unwrap();
                    assert_relative_eq!(*backward.matrix(), forward.matrix().transpose());
                }
            }
        }
    }

    #[test]
    fn body_and_world_frames_are_not_static() {
        let statics = StaticTransforms::new();

        for body in FrameId::ALL.into_iter().filter(|f| !f.is_world()) {
            for world in [FrameId::LocalEnu, FrameId::LocalNed] {
                assert_eq!(
                    statics.transform(Vector3::x(), body, world),
                    Err(Error::UnknownFrameTransform {
                        from: body,
                        to: world
                    })
                );
            }
        }
    }

    #[test]
    fn world_frames_flip_about_x() {
        let transformer = FrameTransformer::default();
        let v = transformer
            .transform(
                Vector3::new(1., 2., 3.),
                FrameId::LocalEnu,
                FrameId::LocalNed,
                None,
            )
            .unwrap();
        assert_eq!(v, Vector3::new(1., -2., -3.));
    }

    #[test]
    fn forward_camera_to_body_down() {
        let transformer = FrameTransformer::default();
        let v = transformer
            .transform(
                Vector3::new(1., 2., 3.),
                FrameId::ForwardCamera,
                FrameId::BodyDown,
                None,
            )
            .unwrap();
        assert_eq!(v, Vector3::new(3., 1., 2.));
    }

    #[test]
    fn camera_optical_axis_points_forward() {
        let transformer = FrameTransformer::default();
        let v = transformer
            .to_local_enu(
                Vector3::z(),
                FrameId::ForwardCamera,
                Some(&UnitQuaternion::identity()),
            )
            .unwrap();
        assert_relative_eq!(v, Vector3::x(), epsilon = 1e-6);
    }

    #[test]
    fn body_rotates_with_orientation() {
        let transformer = FrameTransformer::default();
        let yawed = UnitQuaternion::from_euler_angles(0., 0., FRAC_PI_2);

        let v = transformer
            .to_local_enu(Vector3::x(), FrameId::BodyUp, Some(&yawed))
            .unwrap();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-6);

        let v = transformer
            .transform(Vector3::x(), FrameId::BodyUp, FrameId::LocalNed, Some(&yawed))
            .unwrap();
        assert_relative_eq!(v, -Vector3::y(), epsilon = 1e-6);
    }

    #[test]
    fn round_trip_every_pair() {
        let transformer = FrameTransformer::default();
        let q = orientation();
        let v = Vector3::new(0.25, -0.4, 1.5);

        for a in FrameId::ALL {
            for b in FrameId::ALL {
                let there = transformer.transform(v, a, b, Some(&q)).unwrap();
                let back = transformer.transform(there, b, a, Some(&q)).unwrap();
                assert_relative_eq!(back, v, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn missing_orientation() {
        let transformer = FrameTransformer::default();
        assert_eq!(
            transformer.to_local_enu(Vector3::x(), FrameId::DownwardCamera, None),
            Err(Error::OrientationUnavailable {
                from: FrameId::DownwardCamera,
                to: FrameId::LocalEnu
            })
        );
    }

    #[test]
    fn parse_frame_names() {
        for frame in FrameId::ALL {
            assert_eq!(frame.name().parse::<FrameId>(), Ok(frame));
        }
        assert_eq!(
            "marker".parse::<FrameId>(),
            Err(Error::UnknownFrame("marker".into()))
        );
    }
}
