//! Contact-manifold data model: fixed-capacity records describing contact
//! points, shared by the (not-yet-written) narrow phase, the constraint
//! solver, and the debug-line extractor ([`crate::contact_lines`]).
//!
//! Manifolds are value types with a fixed-size inline array of contact
//! slots and a `count` that is the sole source of validity — slots at or
//! past `count` may hold stale data and must not be read. This mirrors the
//! source engine's flat-addressable, pointer-arithmetic slots; a plain
//! Rust array indexed by `count` gives the same "flat addressability"
//! invariant without unsafe code.

use cgmath::Vector3;

use crate::Real;

/// One contact point of a convex-convex manifold.
///
/// `offset` is measured from body A's position to the contact point.
/// Negative `depth` means the bodies are separated by that distance rather
/// than penetrating. `feature_id` identifies the geometric features (edges,
/// vertices, faces) that produced the contact, and is used by the caller to
/// track contact persistence across frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvexContact {
    /// Offset from body A's position to the contact point.
    pub offset: Vector3<Real>,
    /// Penetration depth; negative means separation.
    pub depth: Real,
    /// Feature id for frame-to-frame persistence tracking.
    pub feature_id: i32,
}

/// One contact point of a nonconvex manifold.
///
/// Identical to [`ConvexContact`] but with its own `normal`, since a
/// nonconvex pair's contact surface is not planar and no single shared
/// normal describes it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonconvexContact {
    /// Offset from body A's position to the contact point.
    pub offset: Vector3<Real>,
    /// Penetration depth; negative means separation.
    pub depth: Real,
    /// This contact's own surface normal.
    pub normal: Vector3<Real>,
    /// Feature id for frame-to-frame persistence tracking.
    pub feature_id: i32,
}

/// Maximum number of contacts a convex manifold can hold.
pub const CONVEX_MANIFOLD_CAPACITY: usize = 4;
/// Maximum number of contacts a nonconvex manifold can hold.
pub const NONCONVEX_MANIFOLD_CAPACITY: usize = 8;

/// Contact manifold for a convex-convex pair: up to four contacts sharing
/// one normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvexContactManifold {
    /// Offset from body A's position to body B's position.
    pub offset_b: Vector3<Real>,
    /// Number of valid contacts; only `contacts[0..count]` is readable.
    pub count: usize,
    /// Shared contact normal for every valid contact in this manifold.
    pub normal: Vector3<Real>,
    contacts: [ConvexContact; CONVEX_MANIFOLD_CAPACITY],
}

impl Default for ConvexContactManifold {
    fn default() -> Self {
        Self {
            offset_b: Vector3::new(0., 0., 0.),
            count: 0,
            normal: Vector3::new(0., 0., 0.),
            contacts: [ConvexContact::default(); CONVEX_MANIFOLD_CAPACITY],
        }
    }
}

impl ConvexContactManifold {
    /// Create an empty manifold with the given inter-body offset and
    /// shared normal.
    pub fn new(offset_b: Vector3<Real>, normal: Vector3<Real>) -> Self {
        Self {
            offset_b,
            normal,
            ..Default::default()
        }
    }

    /// Valid contact slots, `contacts[0..count]`.
    pub fn contacts(&self) -> &[ConvexContact] {
        &self.contacts[..self.count]
    }

    /// Mutable access to the valid contact slots.
    pub fn contacts_mut(&mut self) -> &mut [ConvexContact] {
        &mut self.contacts[..self.count]
    }

    /// Append a contact. Asserts the manifold is not already full.
    pub fn add(&mut self, contact: ConvexContact) {
        debug_assert!(self.count < CONVEX_MANIFOLD_CAPACITY, "manifold is full");
        self.contacts[self.count] = contact;
        self.count += 1;
    }

    /// Remove the contact at `index` without preserving order: decrements
    /// `count`, then if `index` is still a valid slot, overwrites it with
    /// what was the last valid slot. `feature_id` persistence per *index*
    /// is therefore not guaranteed across a removal.
    pub fn fast_remove_at(&mut self, index: usize) {
        debug_assert!(index < self.count, "index out of range");
        self.count -= 1;
        if index < self.count {
            self.contacts[index] = self.contacts[self.count];
        }
    }
}

/// Contact manifold for a nonconvex pair: up to eight contacts, each with
/// its own normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonconvexContactManifold {
    /// Offset from body A's position to body B's position.
    pub offset_b: Vector3<Real>,
    /// Number of valid contacts; only `contacts[0..count]` is readable.
    pub count: usize,
    contacts: [NonconvexContact; NONCONVEX_MANIFOLD_CAPACITY],
}

impl Default for NonconvexContactManifold {
    fn default() -> Self {
        Self {
            offset_b: Vector3::new(0., 0., 0.),
            count: 0,
            contacts: [NonconvexContact::default(); NONCONVEX_MANIFOLD_CAPACITY],
        }
    }
}

impl NonconvexContactManifold {
    /// Create an empty manifold with the given inter-body offset.
    pub fn new(offset_b: Vector3<Real>) -> Self {
        Self {
            offset_b,
            ..Default::default()
        }
    }

    /// Valid contact slots, `contacts[0..count]`.
    pub fn contacts(&self) -> &[NonconvexContact] {
        &self.contacts[..self.count]
    }

    /// Mutable access to the valid contact slots.
    pub fn contacts_mut(&mut self) -> &mut [NonconvexContact] {
        &mut self.contacts[..self.count]
    }

    /// Append a contact built from an offset/depth/feature id plus an
    /// explicit normal. Asserts the manifold is not already full.
    pub fn add(&mut self, offset: Vector3<Real>, depth: Real, normal: Vector3<Real>, feature_id: i32) {
        debug_assert!(self.count < NONCONVEX_MANIFOLD_CAPACITY, "manifold is full");
        self.contacts[self.count] = NonconvexContact {
            offset,
            depth,
            normal,
            feature_id,
        };
        self.count += 1;
    }

    /// Reserve the next slot for the caller to fill in place. Asserts the
    /// manifold is not already full.
    pub fn allocate(&mut self) -> &mut NonconvexContact {
        debug_assert!(self.count < NONCONVEX_MANIFOLD_CAPACITY, "manifold is full");
        let index = self.count;
        self.count += 1;
        &mut self.contacts[index]
    }

    /// Remove the contact at `index` without preserving order (see
    /// [`ConvexContactManifold::fast_remove_at`]).
    pub fn fast_remove_at(&mut self, index: usize) {
        debug_assert!(index < self.count, "index out of range");
        self.count -= 1;
        if index < self.count {
            self.contacts[index] = self.contacts[self.count];
        }
    }
}

/// Polymorphic read view over either manifold kind, as consumed by the
/// contact-line extractor and other manifold-shape-agnostic code.
///
/// For convex manifolds every contact reports the manifold's shared
/// `normal`; for nonconvex manifolds each contact reports its own.
pub trait IContactManifold {
    /// Number of valid contacts.
    fn count(&self) -> usize;

    /// Whether this manifold is convex (one shared normal) or nonconvex
    /// (per-contact normals).
    fn is_convex(&self) -> bool;

    /// Feature id of contact `i`.
    fn feature_id(&self, i: usize) -> i32;

    /// Offset, normal, depth, and feature id of contact `i`.
    fn contact(&self, i: usize) -> (Vector3<Real>, Vector3<Real>, Real, i32);
}

impl IContactManifold for ConvexContactManifold {
    fn count(&self) -> usize {
        self.count
    }

    fn is_convex(&self) -> bool {
        true
    }

    fn feature_id(&self, i: usize) -> i32 {
        self.contacts()[i].feature_id
    }

    fn contact(&self, i: usize) -> (Vector3<Real>, Vector3<Real>, Real, i32) {
        let c = self.contacts()[i];
        (c.offset, self.normal, c.depth, c.feature_id)
    }
}

impl IContactManifold for NonconvexContactManifold {
    fn count(&self) -> usize {
        self.count
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn feature_id(&self, i: usize) -> i32 {
        self.contacts()[i].feature_id
    }

    fn contact(&self, i: usize) -> (Vector3<Real>, Vector3<Real>, Real, i32) {
        let c = self.contacts()[i];
        (c.offset, c.normal, c.depth, c.feature_id)
    }
}
