//! Common capability every collision shape in this crate implements.

/// Stable small-integer type id, used by external dispatch tables that
/// need to tag a shape's concrete type without a vtable.
pub trait Shape {
    /// Stable type id for this shape. `Capsule::TYPE_ID == 1`,
    /// `Mesh::TYPE_ID == 8`.
    const TYPE_ID: u8;
}
