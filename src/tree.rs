//! The bounding-volume hierarchy `Mesh` descends into, and the
//! leaf-tester capability traits its queries are generic over.
//!
//! The production `Tree` is out of scope for this crate (see the crate
//! docs): it is a collaborator whose interface — `SweepBuild`, `RayCast`,
//! `GetOverlaps`, `Sweep`, each driving a caller-supplied leaf tester — is
//! all [`Mesh`](crate::mesh::Mesh) depends on. What follows is a concrete
//! implementation of that interface on top of `collision`'s dynamic
//! bounding-volume tree; it exists so the mesh queries in this crate are
//! actually exercisable end to end, not just declared.

use cgmath::prelude::*;
use cgmath::{Point3, Vector3};
use collision::dbvt::{ContinuousVisitor, DiscreteVisitor, DynamicBoundingVolumeTree, TreeValue};
use collision::{Aabb, Aabb3, Ray3, Union};

use crate::Real;

/// A ray in the mesh's local, unscaled coordinate frame.
#[derive(Debug, Clone, Copy)]
pub struct LocalRay {
    /// Ray origin, local space.
    pub origin: Point3<Real>,
    /// Ray direction, local space (not required to be unit length).
    pub direction: Vector3<Real>,
}

/// Invoked by [`Tree::ray_cast`] once per candidate leaf whose bound the
/// ray may intersect. `max_t` may be shortened to prune remaining
/// candidates from consideration (used by the all-hits ray query).
pub trait RayLeafTester {
    /// Test a single leaf (triangle index into the mesh) against the ray.
    fn test_leaf(&mut self, leaf_index: u32, ray: LocalRay, max_t: &mut Real);
}

/// Invoked by [`Tree::sweep`] once per candidate leaf whose bound the swept
/// volume may intersect.
pub trait SweepLeafTester {
    /// Test a single leaf against the swept query volume.
    fn test_leaf(&mut self, leaf_index: u32, max_t: &mut Real);
}

/// Invoked by [`Tree::get_overlaps`] once per leaf whose bound overlaps the
/// query region. Returning `false` stops the enumeration early.
pub trait OverlapEnumerator {
    /// Visit one overlapping leaf index. Return `false` to stop early.
    fn loop_body(&mut self, leaf_index: u32) -> bool;
}

#[derive(Debug, Clone)]
struct TriangleLeaf {
    index: u32,
    bound: Aabb3<Real>,
}

impl TreeValue for TriangleLeaf {
    type Bound = Aabb3<Real>;

    fn bound(&self) -> &Aabb3<Real> {
        &self.bound
    }

    fn fat_bound(&self) -> Aabb3<Real> {
        self.bound.clone()
    }
}

/// Bounding-volume hierarchy over a mesh's per-triangle local bounds.
///
/// Stand-in for the out-of-scope production `Tree` (see module docs):
/// built once from the triangle bounds and never updated afterwards, since
/// meshes in this crate are immutable once constructed.
#[derive(Debug)]
pub struct Tree {
    dbvt: DynamicBoundingVolumeTree<TriangleLeaf>,
}

impl Tree {
    /// Build the tree from one local-space bound per triangle, indexed by
    /// position in `bounds`.
    pub fn sweep_build(bounds: &[Aabb3<Real>]) -> Self {
        let mut dbvt = DynamicBoundingVolumeTree::new();
        for (index, bound) in bounds.iter().enumerate() {
            dbvt.insert(TriangleLeaf {
                index: index as u32,
                bound: bound.clone(),
            });
        }
        dbvt.update();
        Self { dbvt }
    }

    /// Descend the tree along `ray`, invoking `tester.test_leaf` for every
    /// leaf whose bound the ray may intersect, in no particular order.
    /// `max_t` is read once to seed the candidate search and is otherwise
    /// owned by the tester.
    pub fn ray_cast<T: RayLeafTester>(&self, origin: Point3<Real>, direction: Vector3<Real>, max_t: Real, tester: &mut T) {
        let length = direction.magnitude();
        if length == 0. {
            return;
        }
        let unit_direction = direction / length;
        let ray = Ray3::new(origin, unit_direction);
        let mut visitor = ContinuousVisitor::<Ray3<Real>, TriangleLeaf>::new(&ray);
        let mut remaining_max_t = max_t;
        for (leaf, _point) in self.dbvt.query(&mut visitor) {
            tester.test_leaf(
                leaf.index,
                LocalRay { origin, direction },
                &mut remaining_max_t,
            );
        }
    }

    /// Enumerate every leaf whose bound overlaps `[min, max]`, calling
    /// `enumerator.loop_body` for each; stops early if it returns `false`.
    pub fn get_overlaps<O: OverlapEnumerator>(&self, min: Point3<Real>, max: Point3<Real>, enumerator: &mut O) {
        let query = Aabb3::new(min, max);
        let mut visitor = DiscreteVisitor::<Aabb3<Real>, TriangleLeaf>::new(&query);
        for (leaf, _) in self.dbvt.query(&mut visitor) {
            if !enumerator.loop_body(leaf.index) {
                break;
            }
        }
    }

    /// Descend the tree along a swept `[min, max]` volume translated by
    /// `sweep` over `[0, max_t]`, invoking `tester.test_leaf` for every
    /// candidate leaf whose bound the swept volume may intersect.
    pub fn sweep<T: SweepLeafTester>(&self, min: Point3<Real>, max: Point3<Real>, sweep: Vector3<Real>, max_t: Real, tester: &mut T) {
        let start = Aabb3::new(min, max);
        let end = Aabb3::new(min + sweep * max_t, max + sweep * max_t);
        let query = start.union(&end);
        let mut visitor = DiscreteVisitor::<Aabb3<Real>, TriangleLeaf>::new(&query);
        let mut remaining_max_t = max_t;
        for (leaf, _) in self.dbvt.query(&mut visitor) {
            tester.test_leaf(leaf.index, &mut remaining_max_t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingOverlap {
        indices: Vec<u32>,
    }

    impl OverlapEnumerator for CountingOverlap {
        fn loop_body(&mut self, leaf_index: u32) -> bool {
            self.indices.push(leaf_index);
            true
        }
    }

    #[test]
    fn get_overlaps_finds_the_single_overlapping_leaf() {
        let bounds = vec![Aabb3::new(Point3::new(0., 0., 0.), Point3::new(1., 1., 0.))];
        let tree = Tree::sweep_build(&bounds);
        let mut enumerator = CountingOverlap { indices: Vec::new() };
        tree.get_overlaps(Point3::new(-1., -1., -1.), Point3::new(1., 1., 1.), &mut enumerator);
        assert_eq!(enumerator.indices, vec![0]);
    }
}
