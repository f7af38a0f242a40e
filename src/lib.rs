//! # Collision-geometry core
//!
//! The performance-critical inner loop of a real-time rigid-body physics
//! engine: the shapes ([`Capsule`](capsule::Capsule), [`Mesh`](mesh::Mesh)),
//! their bounds and ray tests, the contact-manifold data model
//! ([`contact`]), and the debug-line extractor that turns solver prestep
//! data into renderable segments ([`contact_lines`]).
//!
//! This crate does not produce contact manifolds from shape pairs (the
//! narrow phase), integrate simulation state, solve constraints, or perform
//! spatial broadphase — those are the surrounding engine's job. What lives
//! here is the geometry: given a shape and a pose, answer "where is it",
//! "what does this ray hit", and "which triangles overlap this region".
//!
//! Uses single precision throughout ([`Real`]). Lane-parallel ("wide")
//! variants exist alongside their scalar counterparts so the same
//! conceptual algorithm can run one-at-a-time or four-at-a-time.

#![deny(missing_docs, missing_debug_implementations, trivial_casts, unused_import_braces, unused_qualifications)]

pub extern crate cgmath;
pub extern crate collision;
pub extern crate wide;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

pub mod capsule;
pub mod contact;
pub mod contact_lines;
pub mod math;
pub mod mesh;
pub mod pose;
pub mod shape;
pub mod tree;

/// Scalar precision used throughout the crate.
///
/// Kept as a single alias point so the library could be retargeted to
/// `f64` later; no feature switch is wired up for it yet, since the
/// wide/SIMD modules here are specified only in terms of `f32` lanes.
pub type Real = f32;

pub use crate::capsule::{Capsule, CapsuleWide};
pub use crate::contact::{
    ConvexContact, ConvexContactManifold, IContactManifold, NonconvexContact,
    NonconvexContactManifold,
};
pub use crate::mesh::{Mesh, Triangle};
pub use crate::pose::RigidPose;
pub use crate::shape::Shape;
