//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// value objects with the same values are the same value. A shipping address
/// snapshot or a stock movement is a value object, a product is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
