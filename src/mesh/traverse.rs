//! Element iteration and circulation.
//!
//! [`VertexIter`], [`EdgeIter`] and [`FaceIter`] walk the index space of one
//! element kind, skipping removed slots. They are double-ended, and their
//! range is fixed when they are created.
//!
//! [`FaceCirculator`] walks the halfedge loop of a face and
//! [`VertexCirculator`] the incoming halfedges of a vertex. Both can be
//! stepped by hand with `advance`/`retreat`, or used as an [`Iterator`]
//! that yields each halfedge of the loop exactly once.
//!
//! Every type here borrows the mesh immutably, so the mesh cannot be
//! mutated while one is alive.

use std::iter::FusedIterator;

use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

macro_rules! element_iter {
    ($name:ident, $id:ident, $count:ident, $valid:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name<'a, I: MeshIndex = u32> {
            mesh: &'a HalfEdgeMesh<I>,
            front: usize,
            back: usize,
        }

        impl<'a, I: MeshIndex> $name<'a, I> {
            pub(crate) fn new(mesh: &'a HalfEdgeMesh<I>) -> Self {
                Self {
                    mesh,
                    front: 0,
                    back: mesh.$count(),
                }
            }

            /// The next slot index this iterator will examine from the front.
            pub fn position(&self) -> usize {
                self.front
            }
        }

        impl<'a, I: MeshIndex> Iterator for $name<'a, I> {
            type Item = $id<I>;

            fn next(&mut self) -> Option<Self::Item> {
                while self.front < self.back {
                    let id = $id::new(self.front);
                    self.front += 1;
                    if self.mesh.$valid(id) {
                        return Some(id);
                    }
                }
                None
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                (0, Some(self.back - self.front))
            }
        }

        impl<'a, I: MeshIndex> DoubleEndedIterator for $name<'a, I> {
            fn next_back(&mut self) -> Option<Self::Item> {
                while self.back > self.front {
                    self.back -= 1;
                    let id = $id::new(self.back);
                    if self.mesh.$valid(id) {
                        return Some(id);
                    }
                }
                None
            }
        }

        impl<'a, I: MeshIndex> FusedIterator for $name<'a, I> {}

        impl<'a, I: MeshIndex> PartialEq for $name<'a, I> {
            fn eq(&self, other: &Self) -> bool {
                std::ptr::eq(self.mesh, other.mesh)
                    && self.front == other.front
                    && self.back == other.back
            }
        }

        impl<'a, I: MeshIndex> Eq for $name<'a, I> {}
    };
}

element_iter!(
    VertexIter,
    VertexId,
    num_vertices,
    is_vertex_valid,
    "Iterator over the vertices that have at least one edge."
);
element_iter!(
    EdgeIter,
    EdgeId,
    num_edges,
    is_edge_valid,
    "Iterator over the live edges."
);
element_iter!(
    FaceIter,
    FaceId,
    num_faces,
    is_face_valid,
    "Iterator over the live faces."
);

/// Circulator over the halfedge loop of a face.
#[derive(Debug, Clone)]
pub struct FaceCirculator<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceCirculator<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }

    /// The halfedge the circulator is at.
    pub fn current(&self) -> HalfEdgeId<I> {
        self.current
    }

    /// Step to the next halfedge of the loop.
    pub fn advance(&mut self) {
        self.current = self.mesh.next(self.current);
    }

    /// Step to the previous halfedge of the loop.
    pub fn retreat(&mut self) {
        self.current = self.mesh.prev(self.current);
    }

    /// Go back to the starting halfedge.
    pub fn reset(&mut self) {
        self.current = self.start;
        self.done = !self.start.is_valid();
    }
}

impl<'a, I: MeshIndex> Iterator for FaceCirculator<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.current;
        self.advance();
        if self.current == self.start {
            self.done = true;
        }
        Some(result)
    }
}

impl<'a, I: MeshIndex> FusedIterator for FaceCirculator<'a, I> {}

/// Circulator over the incoming halfedges of a vertex, counter-clockwise.
#[derive(Debug, Clone)]
pub struct VertexCirculator<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexCirculator<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }

    /// The halfedge the circulator is at.
    pub fn current(&self) -> HalfEdgeId<I> {
        self.current
    }

    /// Rotate counter-clockwise to the next incoming halfedge.
    pub fn advance(&mut self) {
        self.current = self.mesh.sink_ccw(self.current);
    }

    /// Rotate clockwise to the previous incoming halfedge.
    pub fn retreat(&mut self) {
        self.current = self.mesh.sink_cw(self.current);
    }

    /// Go back to the starting halfedge.
    pub fn reset(&mut self) {
        self.current = self.start;
        self.done = !self.start.is_valid();
    }
}

impl<'a, I: MeshIndex> Iterator for VertexCirculator<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.current;
        self.advance();
        if self.current == self.start {
            self.done = true;
        }
        Some(result)
    }
}

impl<'a, I: MeshIndex> FusedIterator for VertexCirculator<'a, I> {}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    // ==================== Iteration ====================

    /// Iterate over vertices that have at least one edge.
    pub fn vertices(&self) -> VertexIter<'_, I> {
        VertexIter::new(self)
    }

    /// Iterate over live edges.
    pub fn edges(&self) -> EdgeIter<'_, I> {
        EdgeIter::new(self)
    }

    /// Iterate over live faces.
    pub fn faces(&self) -> FaceIter<'_, I> {
        FaceIter::new(self)
    }

    /// Iterate over every vertex slot, including isolated and removed ones.
    pub fn vertex_ids(&self) -> impl DoubleEndedIterator<Item = VertexId<I>> + '_ {
        (0..self.num_vertices()).map(VertexId::new)
    }

    /// Circulate the halfedge loop of a face, starting at its stored halfedge.
    pub fn face_circulator(&self, f: FaceId<I>) -> FaceCirculator<'_, I> {
        let start = if self.is_face_valid(f) {
            self.face_halfedge(f)
        } else {
            HalfEdgeId::invalid()
        };
        FaceCirculator::new(self, start)
    }

    /// Circulate the loop (face or boundary) containing `h`, starting at `h`.
    pub fn loop_circulator(&self, h: HalfEdgeId<I>) -> FaceCirculator<'_, I> {
        FaceCirculator::new(self, h)
    }

    /// Circulate the incoming halfedges of a vertex.
    pub fn vertex_circulator(&self, v: VertexId<I>) -> VertexCirculator<'_, I> {
        let start = if self.contains_vertex(v) {
            self.vertex_halfedge(v)
        } else {
            HalfEdgeId::invalid()
        };
        VertexCirculator::new(self, start)
    }

    /// Halfedges of a face, in loop order.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceCirculator<'_, I> {
        self.face_circulator(f)
    }

    /// Corners of a face, in loop order.
    ///
    /// Starts at the source of the face's stored halfedge.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_circulator(f).map(move |h| self.source(h))
    }

    /// Incoming halfedges of a vertex, counter-clockwise.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexCirculator<'_, I> {
        self.vertex_circulator(v)
    }

    /// Vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_circulator(v).map(move |h| self.source(h))
    }

    /// Faces around a vertex.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_circulator(v).filter_map(move |h| {
            let f = self.face(h);
            f.is_valid().then_some(f)
        })
    }
}
