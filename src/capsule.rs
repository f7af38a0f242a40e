//! The capsule shape: the Minkowski sum of a Y-aligned line segment with a
//! sphere. Scalar ([`Capsule`]) and lane-parallel ([`CapsuleWide`]) variants
//! share one conceptual ray-test algorithm.

use cgmath::prelude::*;
use cgmath::{Matrix3, Point3, Quaternion, Vector3};
use collision::Aabb3;
use wide::f32x4;

use crate::math::WideVector3;
use crate::pose::RigidPose;
use crate::shape::Shape;
use crate::Real;

/// Cylinder-degeneracy threshold: below this value of the quadratic `a`
/// coefficient, the ray is treated as parallel to the capsule's axis.
pub const CYLINDER_DEGENERACY_THRESHOLD: Real = 1e-8;

/// A capsule: the Minkowski sum of the segment `[-half_length, half_length]`
/// along local Y with a sphere of `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capsule {
    /// Radius of the capping spheres (and of the cylindrical middle).
    pub radius: Real,
    /// Half the length of the central line segment.
    pub half_length: Real,
}

impl Shape for Capsule {
    const TYPE_ID: u8 = 1;
}

/// Result of a ray test against a capsule (or mesh): whether it hit, the
/// hit time in units of the original (unnormalised) ray direction, and the
/// world-space surface normal at the hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Whether the ray hit the shape.
    pub hit: bool,
    /// Hit time, scaled to the caller's original (possibly non-unit)
    /// direction vector. Meaningless when `hit` is `false`.
    pub t: Real,
    /// World-space surface normal at the hit point. Meaningless when `hit`
    /// is `false`.
    pub normal: Vector3<Real>,
}

impl RayHit {
    fn miss() -> Self {
        Self {
            hit: false,
            t: 0.,
            normal: Vector3::new(0., 0., 0.),
        }
    }
}

impl Capsule {
    /// Create a new capsule.
    pub fn new(radius: Real, half_length: Real) -> Self {
        Self { radius, half_length }
    }

    /// Total length of the central segment, `2 * half_length`.
    pub fn length(&self) -> Real {
        2. * self.half_length
    }

    /// Maximum radius from the body origin to any surface point, and the
    /// maximum lateral displacement ("angular expansion") of any surface
    /// point as the body rotates. Used by the broadphase's speculative
    /// margin (out of scope here; only the two scalars are computed).
    pub fn compute_angular_expansion_data(&self) -> (Real, Real) {
        let maximum_radius = self.half_length + self.radius;
        let maximum_angular_expansion = self.half_length;
        (maximum_radius, maximum_angular_expansion)
    }

    /// World-space axis-aligned bounds for this capsule at the given
    /// orientation (the capsule's local origin is its center, so position
    /// does not affect the bound's extent).
    pub fn compute_bounds(&self, orientation: Quaternion<Real>) -> Aabb3<Real> {
        let axis = orientation.rotate_vector(Vector3::new(0., 1., 0.)) * self.half_length;
        let extent = Vector3::new(axis.x.abs(), axis.y.abs(), axis.z.abs())
            + Vector3::new(self.radius, self.radius, self.radius);
        Aabb3::new(Point3::new(-extent.x, -extent.y, -extent.z), Point3::new(extent.x, extent.y, extent.z))
    }

    /// Diagonal body-space inertia tensor for a capsule of this size and
    /// the given `mass`, treating it as a cylinder plus two hemispherical
    /// caps with volume-weighted composition.
    pub fn compute_inertia(&self, mass: Real) -> Matrix3<Real> {
        use std::f64::consts::PI;
        let pi = PI as Real;
        let r = self.radius;
        let h = self.half_length;

        let cylinder_volume = 2. * h * r * r * pi;
        let sphere_volume = 4. * r * r * r * pi / 3.;
        let total = cylinder_volume + sphere_volume;
        let v_cyl = cylinder_volume / total;
        let v_sph = sphere_volume / total;

        let i_xx = mass
            / (v_cyl * (r * r / 4. + h * h / 3.) + v_sph * (2. * r * r / 5. + 3. * r * h / 4. + h * h));
        let i_yy = mass / (v_cyl * (r * r / 2.) + v_sph * (2. * r * r / 5.));

        Matrix3::new(i_xx, 0., 0., 0., i_yy, 0., 0., 0., i_xx)
    }

    /// Ray test in world space. `origin`/`direction` are world-space;
    /// `direction` need not be unit length — `t` is returned in units of
    /// the original `direction`.
    pub fn ray_test(&self, pose: &RigidPose, origin: Point3<Real>, direction: Vector3<Real>) -> RayHit {
        let local_origin = pose.to_local_point(origin);
        let local_direction = pose.to_local_vector(direction);

        let d_length = local_direction.magnitude();
        if d_length == 0. {
            return RayHit::miss();
        }
        let inverse_d_length = 1. / d_length;
        let d = local_direction * inverse_d_length;
        let mut o = local_origin.to_vec();

        let t_offset = (-o.dot(d) - (self.half_length + self.radius)).max(0.);
        o += d * t_offset;

        let a = d.x * d.x + d.z * d.z;
        let b = o.x * d.x + o.z * d.z;
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;

        if b > 0. && c > 0. {
            return RayHit::miss();
        }

        let mut use_cylinder = false;
        let mut t_cyl = 0.;
        let mut cylinder_hit_y = 0.;
        let mut sphere_y = 0.;

        if a < CYLINDER_DEGENERACY_THRESHOLD {
            sphere_y = if -d.y < 0. { -self.half_length } else { self.half_length };
        } else {
            let discriminant = b * b - a * c;
            if discriminant < 0. {
                return RayHit::miss();
            }
            t_cyl = (-t_offset).max((-b - discriminant.sqrt()) / a);
            let hit_location = o + d * t_cyl;
            cylinder_hit_y = hit_location.y;
            if cylinder_hit_y >= -self.half_length && cylinder_hit_y <= self.half_length {
                use_cylinder = true;
            } else {
                sphere_y = if cylinder_hit_y < 0. { -self.half_length } else { self.half_length };
            }
        }

        if use_cylinder {
            let hit_location = o + d * t_cyl;
            let local_normal = Vector3::new(hit_location.x, 0., hit_location.z) / self.radius;
            let normal = pose.to_world_vector(local_normal);
            return RayHit {
                hit: true,
                t: (t_cyl + t_offset) * inverse_d_length,
                normal,
            };
        }

        // Sphere test at (0, sphere_y, 0).
        let os = o - Vector3::new(0., sphere_y, 0.);
        let b2 = os.dot(d);
        let c2 = os.dot(os) - self.radius * self.radius;
        if b2 > 0. && c2 > 0. {
            return RayHit::miss();
        }
        let discriminant = b2 * b2 - c2;
        if discriminant < 0. {
            return RayHit::miss();
        }
        let t_cap = (-t_offset).max(-b2 - discriminant.sqrt());
        let local_normal = (os + d * t_cap) / self.radius;
        let normal = pose.to_world_vector(local_normal);
        RayHit {
            hit: true,
            t: t_cap + t_offset,
            normal,
        }
    }
}

/// Lane-parallel variant of [`Capsule`]: `radius` and `half_length` become
/// one SIMD lane per capsule instance. Minimum useful batch width is 2
/// rays; this crate fixes the width at 4 lanes (see [`crate::math`]).
#[derive(Debug, Clone, Copy)]
pub struct CapsuleWide {
    /// Per-lane radius.
    pub radius: f32x4,
    /// Per-lane half-length.
    pub half_length: f32x4,
}

impl CapsuleWide {
    /// Fill every lane with the same scalar capsule.
    pub fn broadcast(capsule: Capsule) -> Self {
        Self {
            radius: f32x4::splat(capsule.radius),
            half_length: f32x4::splat(capsule.half_length),
        }
    }

    /// Write a single scalar capsule into lane 0, leaving the others
    /// untouched.
    pub fn gather(&mut self, capsule: Capsule) {
        let mut r = self.radius.to_array();
        let mut h = self.half_length.to_array();
        r[0] = capsule.radius;
        h[0] = capsule.half_length;
        self.radius = f32x4::new(r);
        self.half_length = f32x4::new(h);
    }

    /// Lane-parallel ray test: four independent capsule/ray pairs tested
    /// together. `intersected` is an all-bits-set/all-bits-clear SIMD mask
    /// per lane (usable directly as a `blend` selector).
    pub fn ray_test(
        &self,
        local_origin: WideVector3,
        local_direction: WideVector3,
    ) -> (f32x4, f32x4, WideVector3) {
        let zero = f32x4::splat(0.);
        let one = f32x4::splat(1.);

        let d_length_sq = local_direction.dot(&local_direction);
        let d_length = d_length_sq.sqrt();
        let inverse_d_length = one / d_length;
        let d = local_direction.scale(inverse_d_length);

        let mut o = local_origin;
        let t_offset = (-o.dot(&d) - (self.half_length + self.radius)).max(zero);
        o = o.add(&d.scale(t_offset));

        let a = d.x * d.x + d.z * d.z;
        let b = o.x * d.x + o.z * d.z;
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;

        let outside_pointing_away = b.cmp_gt(zero) & c.cmp_gt(zero);

        let axis_parallel = a.cmp_lt(f32x4::splat(CYLINDER_DEGENERACY_THRESHOLD));

        let discriminant_cyl = b * b - a * c;
        let cyl_has_root = discriminant_cyl.cmp_ge(zero);
        let t_cyl = (-t_offset).max((-b - discriminant_cyl.max(zero).sqrt()) / a);
        let cyl_hit = o.add(&d.scale(t_cyl));
        let cyl_hit_in_band =
            cyl_hit.y.cmp_ge(-self.half_length) & cyl_hit.y.cmp_le(self.half_length);

        let use_cylinder = !axis_parallel & cyl_has_root & cyl_hit_in_band & !outside_pointing_away;
        let cylinder_intersected = !axis_parallel & cyl_has_root & !outside_pointing_away;

        let sphere_y_axis_parallel = (-d.y).cmp_lt(zero).blend(-self.half_length, self.half_length);
        let sphere_y_from_cyl = cyl_hit.y.cmp_lt(zero).blend(-self.half_length, self.half_length);
        let sphere_y = axis_parallel.blend(sphere_y_axis_parallel, sphere_y_from_cyl);

        let os = WideVector3 {
            x: o.x,
            y: o.y - sphere_y,
            z: o.z,
        };
        let b2 = os.dot(&d);
        let c2 = os.dot(&os) - self.radius * self.radius;
        let sphere_outside_pointing_away = b2.cmp_gt(zero) & c2.cmp_gt(zero);
        let discriminant_cap = b2 * b2 - c2;
        let cap_has_root = discriminant_cap.cmp_ge(zero);
        let t_cap = (-t_offset).max(-b2 - discriminant_cap.max(zero).sqrt());
        let cap_intersected = cap_has_root & !sphere_outside_pointing_away;

        let cap_local_normal = WideVector3 {
            x: os.x + d.x * t_cap,
            y: os.y + d.y * t_cap,
            z: os.z + d.z * t_cap,
        }
        .scale(one / self.radius);

        let cyl_local_normal = WideVector3 {
            x: cyl_hit.x,
            y: zero,
            z: cyl_hit.z,
        }
        .scale(one / self.radius);

        // `outside_pointing_away` is the cylinder-coefficient rejection, and
        // the scalar path applies it unconditionally before any
        // axis-parallel/cap branching. `cap_intersected` alone only carries
        // the sphere-level rejection, which is not equivalent (`c2` always
        // dominates `c`, but `b2` can flip sign relative to `b`), so an
        // axis-parallel ray whose origin is far outside the cylinder and
        // pointing away from it must still miss via this gate.
        let intersected = use_cylinder.blend(cylinder_intersected, cap_intersected) & !outside_pointing_away;
        let t = use_cylinder.blend((t_cyl + t_offset) * inverse_d_length, t_cap + t_offset);
        let local_normal = WideVector3::select(use_cylinder, cyl_local_normal, cap_local_normal);

        (intersected, t, local_normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Rad, Rotation3};
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    #[test]
    fn ray_along_z_hits_cylinder_side() {
        let capsule = Capsule::new(1., 2.);
        let pose = RigidPose::identity();
        let hit = capsule.ray_test(&pose, Point3::new(0., 0., -(1. + 2.)), Vector3::new(0., 0., 1.));
        assert!(hit.hit);
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vector3::new(0., 0., -1.), epsilon = 1e-4);
    }

    #[test]
    fn ray_along_minus_y_hits_top_cap() {
        let capsule = Capsule::new(1., 2.);
        let pose = RigidPose::identity();
        let hit = capsule.ray_test(&pose, Point3::new(0., 2. + 1. + 1., 0.), Vector3::new(0., -1., 0.));
        assert!(hit.hit);
        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vector3::new(0., 1., 0.), epsilon = 1e-4);
    }

    #[test]
    fn ray_pointing_away_from_side_misses() {
        let capsule = Capsule::new(1., 2.);
        let pose = RigidPose::identity();
        let hit = capsule.ray_test(&pose, Point3::new(1. + 1., 0., 0.), Vector3::new(1., 0., 0.));
        assert!(!hit.hit);
    }

    #[test]
    fn axis_parallel_ray_picks_near_cap_by_direction_sign() {
        let capsule = Capsule::new(1., 2.);
        let pose = RigidPose::identity();
        // Heading in -y: should hit the +half_length cap first.
        let hit = capsule.ray_test(&pose, Point3::new(0., 10., 0.), Vector3::new(0., -1., 0.));
        assert!(hit.hit);
        assert_relative_eq!(hit.t, 10. - (2. + 1.), epsilon = 1e-4);
    }

    #[test]
    fn axis_parallel_ray_far_from_axis_misses_on_both_scalar_and_wide_paths() {
        // direction is almost exactly +/-Y (a = dx^2+dz^2 well under the
        // axis-parallel threshold), origin is far outside the capsule
        // radius and radially outbound, so this is a "pointing away" miss
        // the random-ray test essentially never samples (it needs a <
        // 1e-8, vanishingly unlikely from uniform direction sampling).
        let capsule = Capsule::new(1., 2.);
        let pose = RigidPose::identity();

        for dy in [1.0_f64 as Real, -1.0] {
            let origin = Point3::new(1000., 0., 0.);
            let direction = Vector3::new(1e-5, dy, 0.);

            let scalar_hit = capsule.ray_test(&pose, origin, direction);
            assert!(!scalar_hit.hit, "scalar should miss for dy = {dy}");

            let wide_capsule = CapsuleWide::broadcast(capsule);
            let local_origin = WideVector3::splat(origin.to_vec());
            let local_direction = WideVector3::splat(direction);
            let (intersected, _, _) = wide_capsule.ray_test(local_origin, local_direction);
            assert_eq!(
                intersected.to_array()[0],
                0.0,
                "wide should miss for dy = {dy}"
            );
        }
    }

    #[test]
    fn scalar_and_wide_agree_on_random_rays() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..64 {
            let capsule = Capsule::new(rng.gen_range(0.2..2.0), rng.gen_range(0.1..3.0));
            let dir = Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if dir.magnitude2() < 1e-6 {
                continue;
            }
            let origin = Vector3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );

            let pose = RigidPose::identity();
            let scalar_hit = capsule.ray_test(&pose, Point3::from_vec(origin), dir);

            let wide_capsule = CapsuleWide::broadcast(capsule);
            let local_origin = WideVector3::splat(origin);
            let local_direction = WideVector3::splat(dir);
            let (intersected, t, normal) = wide_capsule.ray_test(local_origin, local_direction);

            let wide_hit = intersected.to_array()[0] != 0.0;
            assert_eq!(wide_hit, scalar_hit.hit, "mismatch for capsule {:?} dir {:?}", capsule, dir);
            if scalar_hit.hit {
                assert_relative_eq!(t.to_array()[0], scalar_hit.t, epsilon = 1e-3);
                let n = normal.extract(0);
                assert_relative_eq!(n.x, scalar_hit.normal.x, epsilon = 1e-3);
                assert_relative_eq!(n.y, scalar_hit.normal.y, epsilon = 1e-3);
                assert_relative_eq!(n.z, scalar_hit.normal.z, epsilon = 1e-3);
            }
        }
    }
}
