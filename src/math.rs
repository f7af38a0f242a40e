//! Small numerical building blocks shared by the shapes: orthonormal basis
//! construction from a unit normal.

use cgmath::Vector3;
use wide::f32x4;

use crate::Real;

/// An orthonormal basis `(tangent, normal, bitangent)`, right-handed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthonormalBasis {
    /// First tangent, perpendicular to `normal`.
    pub t1: Vector3<Real>,
    /// Second tangent, perpendicular to both `normal` and `t1`.
    pub t2: Vector3<Real>,
}

/// Build a right-handed orthonormal basis `(t1, normal, t2)` from a unit
/// `normal`, using the revised Frisvad construction.
///
/// The original Frisvad basis has a singularity at `normal.z == -1`; this
/// revision folds the sign of `normal.z` into the construction so the only
/// remaining discontinuity is at `normal.z == 0`, which is acceptable for
/// solver use (see the module-level discussion in the design notes).
pub fn orthonormal_basis(normal: Vector3<Real>) -> OrthonormalBasis {
    let sign = if normal.z < 0. { -1. } else { 1. };
    let scale = -1. / (sign + normal.z);
    let t1 = Vector3::new(
        normal.x * normal.y * scale,
        sign + normal.y * normal.y * scale,
        -normal.y,
    );
    let t2 = Vector3::new(
        1. + sign * normal.x * normal.x * scale,
        sign * t1.x,
        -sign * normal.x,
    );
    OrthonormalBasis { t1, t2 }
}

/// Compute only the first tangent of the basis built by
/// [`orthonormal_basis`]. Cheaper when the second tangent is not needed.
pub fn find_perpendicular(normal: Vector3<Real>) -> Vector3<Real> {
    let sign = if normal.z < 0. { -1. } else { 1. };
    let scale = -1. / (sign + normal.z);
    Vector3::new(
        normal.x * normal.y * scale,
        sign + normal.y * normal.y * scale,
        -normal.y,
    )
}

/// Lane-parallel vector of four `Real`s, x/y/z components each a SIMD lane.
#[derive(Debug, Clone, Copy)]
pub struct WideVector3 {
    /// X components, one per lane.
    pub x: f32x4,
    /// Y components, one per lane.
    pub y: f32x4,
    /// Z components, one per lane.
    pub z: f32x4,
}

impl WideVector3 {
    /// Broadcast a single scalar vector into all four lanes.
    pub fn splat(v: Vector3<Real>) -> Self {
        Self {
            x: f32x4::splat(v.x),
            y: f32x4::splat(v.y),
            z: f32x4::splat(v.z),
        }
    }

    /// Build from four lane-separated vectors.
    pub fn from_lanes(v: [Vector3<Real>; 4]) -> Self {
        Self {
            x: f32x4::new([v[0].x, v[1].x, v[2].x, v[3].x]),
            y: f32x4::new([v[0].y, v[1].y, v[2].y, v[3].y]),
            z: f32x4::new([v[0].z, v[1].z, v[2].z, v[3].z]),
        }
    }

    /// Extract lane `i` as a scalar vector.
    pub fn extract(&self, i: usize) -> Vector3<Real> {
        Vector3::new(
            self.x.to_array()[i],
            self.y.to_array()[i],
            self.z.to_array()[i],
        )
    }

    /// Write a scalar vector into lane 0, leaving other lanes untouched.
    pub fn gather_lane0(&mut self, v: Vector3<Real>) {
        let mut xs = self.x.to_array();
        let mut ys = self.y.to_array();
        let mut zs = self.z.to_array();
        xs[0] = v.x;
        ys[0] = v.y;
        zs[0] = v.z;
        self.x = f32x4::new(xs);
        self.y = f32x4::new(ys);
        self.z = f32x4::new(zs);
    }

    /// Component-wise dot product, one scalar per lane.
    pub fn dot(&self, other: &WideVector3) -> f32x4 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Component-wise addition.
    pub fn add(&self, other: &WideVector3) -> WideVector3 {
        WideVector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    /// Component-wise subtraction.
    pub fn sub(&self, other: &WideVector3) -> WideVector3 {
        WideVector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    /// Scale every lane by a per-lane scalar.
    pub fn scale(&self, s: f32x4) -> WideVector3 {
        WideVector3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Select componentwise between `if_true` and `if_false` using `mask`
    /// (an all-bits-set / all-bits-clear SIMD mask per lane).
    pub fn select(mask: f32x4, if_true: WideVector3, if_false: WideVector3) -> WideVector3 {
        WideVector3 {
            x: mask.blend(if_true.x, if_false.x),
            y: mask.blend(if_true.y, if_false.y),
            z: mask.blend(if_true.z, if_false.z),
        }
    }
}

/// Lane-parallel variant of [`orthonormal_basis`].
pub fn orthonormal_basis_wide(normal: WideVector3) -> (WideVector3, WideVector3) {
    let zero = f32x4::splat(0.);
    let one = f32x4::splat(1.);
    let neg_one = f32x4::splat(-1.);
    let sign = normal.z.cmp_lt(zero).blend(neg_one, one);
    let scale = neg_one / (sign + normal.z);
    let t1 = WideVector3 {
        x: normal.x * normal.y * scale,
        y: sign + normal.y * normal.y * scale,
        z: -normal.y,
    };
    let t2 = WideVector3 {
        x: one + sign * normal.x * normal.x * scale,
        y: sign * t1.x,
        z: -sign * normal.x,
    };
    (t1, t2)
}
