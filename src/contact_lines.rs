//! Debug-line extraction: projects a contact manifold's prestep data into
//! world-space line segments for visualization.
//!
//! The source engine has one extractor type per (contact count, convex |
//! nonconvex) pair — sixteen in all, a consequence of its generic-dispatch
//! limitations. [`crate::contact::IContactManifold`] already erases both
//! discriminants behind `count()` and `contact(i)`, so here that collapses
//! to the single [`extract`] routine the design notes ask for.

use cgmath::{Point3, Vector3};

use crate::contact::IContactManifold;
use crate::math::find_perpendicular;
use crate::pose::RigidPose;
use crate::Real;

/// RGBA tint applied to every line segment emitted for one contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint(pub [f32; 4]);

/// One renderable line segment, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInstance {
    /// Segment start, world space.
    pub start: Point3<Real>,
    /// Segment end, world space.
    pub end: Point3<Real>,
    /// Tint to render the segment with.
    pub tint: Tint,
}

/// Where extracted line segments go. The renderer's line buffer, out of
/// scope for this crate, is expected to implement this.
pub trait ContactLineSink {
    /// Append one line segment.
    fn add_line(&mut self, start: Point3<Real>, end: Point3<Real>, tint: Tint);
}

impl ContactLineSink for Vec<LineInstance> {
    fn add_line(&mut self, start: Point3<Real>, end: Point3<Real>, tint: Tint) {
        self.push(LineInstance { start, end, tint });
    }
}

/// Length, in world units, of each emitted line segment.
pub const CONTACT_LINE_LENGTH: Real = 0.3;

/// The `ContactLines.Add` collaborator: given body A's pose and one
/// contact's offset/normal/depth, appends one tangent-direction line and
/// one normal-direction line, both anchored at the contact point
/// `poseA.position + offset`.
pub struct ContactLines;

impl ContactLines {
    /// Append the two line segments for a single contact to `sink`.
    pub fn add<S: ContactLineSink>(pose_a: &RigidPose, offset: Vector3<Real>, normal: Vector3<Real>, depth: Real, tint: Tint, sink: &mut S) {
        let point = pose_a.position + offset;
        let tangent = find_perpendicular(normal);

        sink.add_line(point, point + tangent * CONTACT_LINE_LENGTH, tint);
        sink.add_line(point, point + normal * depth, tint);
    }
}

/// Extract `2 * manifold.count()` debug line segments from `manifold`,
/// anchored at `pose_a`, tinted with `tint`.
///
/// `pose_a` is always body A's pose, never body B's: contact offsets are
/// expressed from body A's position, so even a two-body manifold only
/// needs the one pose.
///
/// One routine handles every supported prestep layout (convex 1- and
/// two-body with 1..=4 contacts; nonconvex 1- and two-body with 2..=8
/// contacts) because [`IContactManifold`] already exposes both the contact
/// count and the convex/nonconvex discriminant uniformly.
pub fn extract<M: IContactManifold, S: ContactLineSink>(manifold: &M, pose_a: RigidPose, tint: Tint, sink: &mut S) {
    for i in 0..manifold.count() {
        let (offset, normal, depth, _feature_id) = manifold.contact(i);
        ContactLines::add(&pose_a, offset, normal, depth, tint, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::One;
    use crate::contact::{ConvexContact, ConvexContactManifold, NonconvexContactManifold};

    fn tint() -> Tint {
        Tint([1.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn convex_manifold_emits_two_lines_per_contact() {
        let mut manifold = ConvexContactManifold::new(Vector3::new(1., 0., 0.), Vector3::new(0., 1., 0.));
        manifold.add(ConvexContact {
            offset: Vector3::new(0.1, 0., 0.),
            depth: -0.02,
            feature_id: 1,
        });
        manifold.add(ConvexContact {
            offset: Vector3::new(-0.1, 0., 0.),
            depth: -0.01,
            feature_id: 2,
        });

        let mut lines = Vec::new();
        extract(&manifold, RigidPose::identity(), tint(), &mut lines);
        assert_eq!(lines.len(), 2 * manifold.count());
    }

    #[test]
    fn nonconvex_manifold_emits_two_lines_per_contact_up_to_capacity() {
        let mut manifold = NonconvexContactManifold::new(Vector3::new(0., 0., 0.));
        for i in 0..8 {
            manifold.add(Vector3::new(0., 0., i as Real * 0.1), -0.01, Vector3::new(0., 1., 0.), i);
        }

        let mut lines = Vec::new();
        extract(&manifold, RigidPose::identity(), tint(), &mut lines);
        assert_eq!(lines.len(), 16);
    }

    #[test]
    fn empty_manifold_emits_no_lines() {
        let manifold = ConvexContactManifold::default();
        let mut lines = Vec::new();
        extract(&manifold, RigidPose::identity(), tint(), &mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn line_anchor_is_pose_position_plus_offset() {
        let mut manifold = ConvexContactManifold::new(Vector3::new(0., 0., 0.), Vector3::new(0., 1., 0.));
        manifold.add(ConvexContact {
            offset: Vector3::new(2., 0., 0.),
            depth: -0.05,
            feature_id: 0,
        });
        let pose = RigidPose::new(Point3::new(5., 0., 0.), cgmath::Quaternion::one());

        let mut lines = Vec::new();
        extract(&manifold, pose, tint(), &mut lines);
        assert_eq!(lines[0].start, Point3::new(7., 0., 0.));
        assert_eq!(lines[1].start, Point3::new(7., 0., 0.));
    }
}
