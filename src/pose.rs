//! Rigid body pose: orientation plus position.

use cgmath::prelude::*;
use cgmath::{Point3, Quaternion, Vector3};

use crate::Real;

/// Orientation plus position of a rigid body, in world space.
///
/// This is the minimal read-only view the shapes in this crate need from
/// the engine's body-pose storage (out of scope here, see the crate docs);
/// callers project their own `Sets[setIndex].Poses[bodyIndex]` record into
/// one of these before invoking a query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidPose {
    /// World-space position of the body origin.
    pub position: Point3<Real>,
    /// World-space orientation of the body.
    pub orientation: Quaternion<Real>,
}

impl RigidPose {
    /// Create a pose from a position and orientation.
    pub fn new(position: Point3<Real>, orientation: Quaternion<Real>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Identity pose: origin, no rotation.
    pub fn identity() -> Self {
        Self::new(Point3::new(0., 0., 0.), Quaternion::one())
    }

    /// Transform a world-space point into this pose's local frame.
    pub fn to_local_point(&self, world: Point3<Real>) -> Point3<Real> {
        self.orientation.invert().rotate_point(world - self.position.to_vec())
    }

    /// Transform a world-space vector into this pose's local frame
    /// (rotation only, no translation).
    pub fn to_local_vector(&self, world: Vector3<Real>) -> Vector3<Real> {
        self.orientation.invert().rotate_vector(world)
    }

    /// Transform a local-space vector into world space (rotation only).
    pub fn to_world_vector(&self, local: Vector3<Real>) -> Vector3<Real> {
        self.orientation.rotate_vector(local)
    }

    /// Transform a local-space point into world space.
    pub fn to_world_point(&self, local: Point3<Real>) -> Point3<Real> {
        self.position + self.orientation.rotate_point(local).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Rad, Rotation3};

    #[test]
    fn identity_round_trips() {
        let pose = RigidPose::identity();
        let p = Point3::new(1., 2., 3.);
        assert_relative_eq!(pose.to_world_point(p), p);
        assert_relative_eq!(pose.to_local_point(p), p);
    }

    #[test]
    fn rotation_then_inverse_round_trips() {
        let pose = RigidPose::new(
            Point3::new(5., 0., 0.),
            Quaternion::from_angle_y(Rad(0.7)),
        );
        let world = Point3::new(1., 2., 3.);
        let local = pose.to_local_point(world);
        let back = pose.to_world_point(local);
        assert_relative_eq!(back, world, epsilon = 1e-5);
    }
}
