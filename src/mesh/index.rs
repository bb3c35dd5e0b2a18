//! Index types for mesh elements.
//!
//! Vertices, halfedges and faces are identified by type-safe index wrappers
//! around an unsigned integer. The maximum value of the integer is reserved as
//! the "invalid" sentinel. Halfedges come in twin pairs `(2k, 2k + 1)`, so the
//! twin of a halfedge is found by flipping the lowest bit of its index, and an
//! edge is simply the pair index `k`.

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Trait for types that can be used as mesh indices.
///
/// This trait is implemented for `u16`, `u32`, and `u64`, allowing users to choose
/// the appropriate index size for their mesh.
pub trait MeshIndex:
    Copy + Clone + Eq + PartialEq + Ord + PartialOrd + Hash + Debug + Send + Sync + 'static
{
    /// The maximum valid index value.
    const MAX: Self;

    /// A sentinel value representing an invalid/null index.
    const INVALID: Self;

    /// Convert from usize to this index type.
    ///
    /// # Panics
    /// Panics if the value is too large for this index type. Mutating mesh
    /// operations check their capacity first and return
    /// [`MeshError::CapacityExceeded`](crate::error::MeshError::CapacityExceeded)
    /// instead.
    fn from_usize(v: usize) -> Self;

    /// Convert to usize.
    fn to_usize(self) -> usize;

    /// Check if this is a valid (non-sentinel) index.
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl MeshIndex for u16 {
    const MAX: Self = u16::MAX - 1;
    const INVALID: Self = u16::MAX;

    #[inline]
    fn from_usize(v: usize) -> Self {
        assert!(v <= Self::MAX as usize, "index {} too large for u16", v);
        v as u16
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl MeshIndex for u32 {
    const MAX: Self = u32::MAX - 1;
    const INVALID: Self = u32::MAX;

    #[inline]
    fn from_usize(v: usize) -> Self {
        assert!(v <= Self::MAX as usize, "index {} too large for u32", v);
        v as u32
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl MeshIndex for u64 {
    const MAX: Self = u64::MAX - 1;
    const INVALID: Self = u64::MAX;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v as u64
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// A type-safe halfedge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct HalfEdgeId<I: MeshIndex = u32>(I);

/// A type-safe face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

/// A type-safe edge index.
///
/// Edge `k` is the twin pair of halfedges `2k` and `2k + 1`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId<I: MeshIndex = u32>(I);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl<I: MeshIndex> $name<I> {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Get the raw value of the underlying type.
            #[inline]
            pub fn raw(self) -> I {
                self.0
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl<I: MeshIndex> From<usize> for $name<I> {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(HalfEdgeId, "HE");
impl_index_type!(FaceId, "F");
impl_index_type!(EdgeId, "E");

impl<I: MeshIndex> HalfEdgeId<I> {
    /// The twin halfedge: the other member of the pair.
    #[inline]
    pub fn opposite(self) -> Self {
        debug_assert!(self.is_valid(), "opposite of an invalid halfedge");
        Self::new(self.index() ^ 1)
    }

    /// The edge this halfedge belongs to.
    #[inline]
    pub fn edge(self) -> EdgeId<I> {
        EdgeId::new(self.index() >> 1)
    }

    /// Whether this is the even (canonical) member of its pair.
    #[inline]
    pub fn is_canonical(self) -> bool {
        self.index() & 1 == 0
    }
}

impl<I: MeshIndex> EdgeId<I> {
    /// The even halfedge that represents this edge.
    #[inline]
    pub fn halfedge(self) -> HalfEdgeId<I> {
        HalfEdgeId::new(self.index() << 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert!(v.is_valid());

        let invalid: VertexId = VertexId::invalid();
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_type_safety() {
        let v: VertexId = VertexId::new(0);
        let he: HalfEdgeId = HalfEdgeId::new(0);
        let f: FaceId = FaceId::new(0);

        assert_eq!(v.index(), he.index());
        assert_eq!(he.index(), f.index());
    }

    #[test]
    fn test_small_indices() {
        let v: VertexId<u16> = VertexId::new(1000);
        assert_eq!(v.index(), 1000);
        assert!(!VertexId::<u16>::invalid().is_valid());
    }

    #[test]
    fn test_debug_format() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(format!("{:?}", v), "V(42)");

        let invalid: HalfEdgeId = HalfEdgeId::invalid();
        assert_eq!(format!("{:?}", invalid), "HE(INVALID)");
    }

    #[test]
    fn test_opposite_is_involution() {
        for i in 0..10 {
            let h: HalfEdgeId = HalfEdgeId::new(i);
            assert_ne!(h, h.opposite());
            assert_eq!(h.opposite().opposite(), h);
            assert_eq!(h.edge(), h.opposite().edge());
        }
    }

    #[test]
    fn test_edge_halfedge() {
        let e: EdgeId = EdgeId::new(3);
        assert_eq!(e.halfedge().index(), 6);
        assert!(e.halfedge().is_canonical());
        assert!(!e.halfedge().opposite().is_canonical());
        assert_eq!(e.halfedge().edge(), e);
    }
}
