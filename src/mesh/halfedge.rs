//! Half-edge mesh data structure.
//!
//! This module provides the storage and read-only queries of the half-edge
//! (doubly-connected edge list) representation. Faces may be arbitrary
//! simple polygons. Mutation lives in the `edit` and `builder` modules,
//! traversal in `traverse`.
//!
//! # Structure
//!
//! - Halfedges are allocated in twin pairs `(2k, 2k + 1)`; the twin of a
//!   halfedge is found by index arithmetic, not stored
//! - Each halfedge knows its **sink** vertex (the vertex it points to), its
//!   incident **face**, and its **next**/**prev** halfedges around that face
//! - Each vertex stores one **incoming** halfedge (one whose sink it is)
//! - Each face stores one halfedge of its loop
//!
//! All per-element data, including the adjacency records above and the
//! vertex positions, is kept in [`Property`] arrays. User-defined
//! properties can be attached to each element kind at any time and always
//! have one slot per element.
//!
//! # Boundary Handling
//!
//! Boundary halfedges have an invalid face. They are linked into loops with
//! `next`/`prev` exactly like face loops. A boundary vertex always stores a
//! boundary halfedge.
//!
//! # Removed Elements
//!
//! Removal never compacts the arrays. A removed element keeps its slot with
//! reset adjacency, and iteration skips it.

use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::observer::{Listeners, MeshVersion};
use super::property::{Property, PropertyHandle, PropertySet};
use crate::error::{MeshError, Result};

/// Connectivity record of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAdjacency<I: MeshIndex = u32> {
    /// One halfedge pointing to this vertex.
    /// Invalid for isolated or removed vertices.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Default for VertexAdjacency<I> {
    fn default() -> Self {
        Self {
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// Connectivity record of a halfedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdgeAdjacency<I: MeshIndex = u32> {
    /// The vertex this halfedge points to.
    pub vertex: VertexId<I>,

    /// The face this halfedge belongs to.
    /// Invalid for boundary halfedges.
    pub face: FaceId<I>,

    /// The next halfedge around the face or boundary loop.
    pub next: HalfEdgeId<I>,

    /// The previous halfedge around the face or boundary loop.
    pub prev: HalfEdgeId<I>,
}

impl<I: MeshIndex> Default for HalfEdgeAdjacency<I> {
    fn default() -> Self {
        Self {
            vertex: VertexId::invalid(),
            face: FaceId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
        }
    }
}

/// Connectivity record of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceAdjacency<I: MeshIndex = u32> {
    /// One halfedge of the face loop. Invalid for removed faces.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Default for FaceAdjacency<I> {
    fn default() -> Self {
        Self {
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge mesh with polygonal faces.
///
/// The index type `I` selects the width of element handles (`u16`, `u32`
/// or `u64`).
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    /// Vertex adjacency, one slot per vertex.
    pub(crate) vertices: Property<VertexAdjacency<I>>,

    /// Vertex positions, one slot per vertex.
    pub(crate) points: Property<Point3<f64>>,

    /// Halfedge adjacency, two slots per edge.
    pub(crate) halfedges: Property<HalfEdgeAdjacency<I>>,

    /// Face adjacency, one slot per face.
    pub(crate) faces: Property<FaceAdjacency<I>>,

    /// User-defined vertex properties.
    pub(crate) vertex_props: PropertySet,

    /// User-defined halfedge properties.
    pub(crate) halfedge_props: PropertySet,

    /// User-defined face properties.
    pub(crate) face_props: PropertySet,

    pub(crate) version: MeshVersion,

    pub(crate) listeners: Listeners<I>,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Property::new("v:connectivity", VertexAdjacency::default()),
            points: Property::new("v:point", Point3::origin()),
            halfedges: Property::new("h:connectivity", HalfEdgeAdjacency::default()),
            faces: Property::new("f:connectivity", FaceAdjacency::default()),
            vertex_props: PropertySet::new(),
            halfedge_props: PropertySet::new(),
            face_props: PropertySet::new(),
            version: MeshVersion::default(),
            listeners: Listeners::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed triangle mesh: E = 3F/2, so HE = 3F.
        // Leave some slack for boundary.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        let mut mesh = Self::new();
        mesh.reserve(num_vertices, num_halfedges, num_faces);
        mesh
    }

    /// Reserve room for more elements in every property array.
    pub fn reserve(&mut self, vertices: usize, halfedges: usize, faces: usize) {
        self.vertices.reserve(vertices);
        self.points.reserve(vertices);
        self.halfedges.reserve(halfedges);
        self.faces.reserve(faces);
        self.vertex_props.reserve(vertices);
        self.halfedge_props.reserve(halfedges);
        self.face_props.reserve(faces);
    }

    /// Check that the mesh can hold the given total element counts.
    ///
    /// Slot `I::MAX` is the largest addressable index, so each count must
    /// stay at or below it.
    pub(crate) fn ensure_capacity(
        &self,
        vertices: usize,
        halfedges: usize,
        faces: usize,
    ) -> Result<()> {
        let max = I::MAX.to_usize();
        for (element, requested) in [
            ("vertex", vertices),
            ("halfedge", halfedges),
            ("face", faces),
        ] {
            if requested > max {
                return Err(MeshError::CapacityExceeded {
                    element,
                    requested,
                    max,
                });
            }
        }
        Ok(())
    }

    // ==================== Counts ====================

    /// Number of vertex slots, including removed ones.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of halfedge slots, including removed ones.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of edge slots, including removed ones.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Number of face slots, including removed ones.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    // ==================== Validity ====================

    /// Whether `v` refers to a vertex slot of this mesh.
    ///
    /// Isolated and removed vertices are contained but not valid.
    #[inline]
    pub fn contains_vertex(&self, v: VertexId<I>) -> bool {
        v.is_valid() && v.index() < self.num_vertices()
    }

    /// Whether `v` is a vertex with at least one edge.
    #[inline]
    pub fn is_vertex_valid(&self, v: VertexId<I>) -> bool {
        self.contains_vertex(v) && self.vertex_halfedge(v).is_valid()
    }

    /// Whether `h` is a live halfedge.
    #[inline]
    pub fn is_halfedge_valid(&self, h: HalfEdgeId<I>) -> bool {
        h.is_valid() && h.index() < self.num_halfedges() && self.vertex(h).is_valid()
    }

    /// Whether `e` is a live edge.
    #[inline]
    pub fn is_edge_valid(&self, e: EdgeId<I>) -> bool {
        e.is_valid() && self.is_halfedge_valid(e.halfedge())
    }

    /// Whether `f` is a live face.
    #[inline]
    pub fn is_face_valid(&self, f: FaceId<I>) -> bool {
        f.is_valid() && f.index() < self.num_faces() && self.face_halfedge(f).is_valid()
    }

    // ==================== Topology Queries ====================

    /// The twin halfedge.
    #[inline]
    pub fn opposite(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        h.opposite()
    }

    /// The vertex a halfedge points to.
    #[inline]
    pub fn vertex(&self, h: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedges.get(h.index()).vertex
    }

    /// The vertex a halfedge points to. Same as [`Self::vertex`].
    #[inline]
    pub fn sink(&self, h: HalfEdgeId<I>) -> VertexId<I> {
        self.vertex(h)
    }

    /// The vertex a halfedge starts from.
    #[inline]
    pub fn source(&self, h: HalfEdgeId<I>) -> VertexId<I> {
        self.vertex(h.opposite())
    }

    /// The next halfedge around the face or boundary loop.
    #[inline]
    pub fn next(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedges.get(h.index()).next
    }

    /// The previous halfedge around the face or boundary loop.
    #[inline]
    pub fn prev(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedges.get(h.index()).prev
    }

    /// The face of a halfedge (invalid on the boundary).
    #[inline]
    pub fn face(&self, h: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedges.get(h.index()).face
    }

    /// The stored incoming halfedge of a vertex.
    #[inline]
    pub fn vertex_halfedge(&self, v: VertexId<I>) -> HalfEdgeId<I> {
        self.vertices.get(v.index()).halfedge
    }

    /// The stored halfedge of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId<I>) -> HalfEdgeId<I> {
        self.faces.get(f.index()).halfedge
    }

    /// Full adjacency record of a halfedge.
    #[inline]
    pub fn halfedge_adjacency(&self, h: HalfEdgeId<I>) -> &HalfEdgeAdjacency<I> {
        self.halfedges.get(h.index())
    }

    /// Whether a halfedge has no face.
    #[inline]
    pub fn is_boundary_halfedge(&self, h: HalfEdgeId<I>) -> bool {
        !self.face(h).is_valid()
    }

    /// Whether either side of the edge containing `h` is boundary.
    #[inline]
    pub fn is_boundary_edge(&self, h: HalfEdgeId<I>) -> bool {
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(h.opposite())
    }

    /// Next outgoing halfedge clockwise around the source of `h`.
    #[inline]
    pub fn source_cw(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.next(h.opposite())
    }

    /// Next outgoing halfedge counter-clockwise around the source of `h`.
    #[inline]
    pub fn source_ccw(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.prev(h).opposite()
    }

    /// Next incoming halfedge clockwise around the sink of `h`.
    #[inline]
    pub fn sink_cw(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.next(h).opposite()
    }

    /// Next incoming halfedge counter-clockwise around the sink of `h`.
    #[inline]
    pub fn sink_ccw(&self, h: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.prev(h.opposite())
    }

    /// Find the halfedge going from `from` to `to`.
    ///
    /// Runs in O(valence of `to`).
    pub fn find_halfedge(&self, from: VertexId<I>, to: VertexId<I>) -> Option<HalfEdgeId<I>> {
        if !self.is_vertex_valid(to) {
            return None;
        }
        self.vertex_halfedges(to).find(|&h| self.source(h) == from)
    }

    /// Find any boundary halfedge pointing to `v`.
    pub fn find_boundary_incoming(&self, v: VertexId<I>) -> Option<HalfEdgeId<I>> {
        if !self.is_vertex_valid(v) {
            return None;
        }
        self.vertex_halfedges(v)
            .find(|&h| self.is_boundary_halfedge(h))
    }

    /// Number of edges incident to a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// Number of sides of a face.
    pub fn face_size(&self, f: FaceId<I>) -> usize {
        self.face_halfedges(f).count()
    }

    /// The vertices adjacent to `v`, counter-clockwise.
    pub fn vertex_one_ring(&self, v: VertexId<I>) -> Vec<VertexId<I>> {
        self.vertex_neighbors(v).collect()
    }

    /// Whether a vertex touches the boundary.
    ///
    /// Isolated vertices count as boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        if !self.is_vertex_valid(v) {
            return true;
        }
        self.vertex_halfedges(v)
            .any(|h| self.is_boundary_edge(h))
    }

    /// Whether the mesh has no boundary halfedges.
    pub fn is_closed(&self) -> bool {
        self.edges()
            .all(|e| !self.is_boundary_edge(e.halfedge()))
    }

    /// Whether every face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces().all(|f| self.face_size(f) == 3)
    }

    /// Whether every face is a quad.
    pub fn is_quad_mesh(&self) -> bool {
        self.faces().all(|f| self.face_size(f) == 4)
    }

    // ==================== Geometry ====================

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        self.points.get(v.index())
    }

    /// Position of a vertex. Same as [`Self::position`].
    #[inline]
    pub fn vertex_point(&self, v: VertexId<I>) -> Point3<f64> {
        *self.position(v)
    }

    /// Positions of every vertex slot.
    pub fn points(&self) -> &[Point3<f64>] {
        self.points.as_slice()
    }

    /// Corner positions of a face, in loop order.
    pub fn face_points(&self, f: FaceId<I>) -> Vec<Point3<f64>> {
        self.face_vertices(f).map(|v| *self.position(v)).collect()
    }

    /// Vector from the source to the sink of a halfedge.
    #[inline]
    pub fn halfedge_vector(&self, h: HalfEdgeId<I>) -> Vector3<f64> {
        self.position(self.sink(h)) - self.position(self.source(h))
    }

    /// Length of a halfedge.
    #[inline]
    pub fn halfedge_length(&self, h: HalfEdgeId<I>) -> f64 {
        self.halfedge_vector(h).norm()
    }

    /// Squared length of a halfedge.
    #[inline]
    pub fn halfedge_length_squared(&self, h: HalfEdgeId<I>) -> f64 {
        self.halfedge_vector(h).norm_squared()
    }

    /// Point at parameter `t` along a halfedge (0 at the source, 1 at the sink).
    pub fn halfedge_lerp(&self, h: HalfEdgeId<I>, t: f64) -> Point3<f64> {
        self.position(self.source(h)) + self.halfedge_vector(h) * t
    }

    /// Midpoint of a halfedge.
    pub fn halfedge_midpoint(&self, h: HalfEdgeId<I>) -> Point3<f64> {
        self.halfedge_lerp(h, 0.5)
    }

    /// Cotangent of the angle opposite `h` in its triangle.
    ///
    /// Zero for boundary halfedges and degenerate corners.
    pub fn halfedge_cotan(&self, h: HalfEdgeId<I>) -> f64 {
        if self.is_boundary_halfedge(h) {
            return 0.0;
        }
        let n = self.next(h);
        let p0 = self.position(self.sink(n));
        let u = self.position(self.sink(self.next(n))) - p0;
        let v = self.position(self.sink(h)) - p0;

        let denom = u.cross(&v).norm();
        if denom <= f64::MIN_POSITIVE {
            return 0.0;
        }
        u.dot(&v) / denom
    }

    /// Interior angle of the face of `h` at the sink of `h`, in radians.
    pub fn angle_at_vertex(&self, h: HalfEdgeId<I>) -> f64 {
        let corner = self.position(self.sink(h));
        let a = self.position(self.source(h)) - corner;
        let b = self.position(self.sink(self.next(h))) - corner;
        a.cross(&b).norm().atan2(a.dot(&b))
    }

    /// Twice the vector area of a face (Newell's method).
    fn face_vector_area2(&self, f: FaceId<I>) -> Vector3<f64> {
        let points = self.face_points(f);
        let n = points.len();
        (0..n)
            .map(|i| points[i].coords.cross(&points[(i + 1) % n].coords))
            .sum()
    }

    /// Unit normal of a face. Zero for degenerate faces.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        self.face_vector_area2(f)
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        0.5 * self.face_vector_area2(f).norm()
    }

    /// Average of the corner positions of a face.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let points = self.face_points(f);
        if points.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
        Point3::from(sum / points.len() as f64)
    }

    /// One third of the total area of the faces around a vertex.
    pub fn vertex_area(&self, v: VertexId<I>) -> f64 {
        let total: f64 = self.vertex_faces(v).map(|f| self.face_area(f)).sum();
        total / 3.0
    }

    /// Vertex normal weighted by the corner angle of each incident face.
    ///
    /// Zero for isolated vertices and fully degenerate neighborhoods.
    pub fn angle_weighted_vertex_normal(&self, v: VertexId<I>) -> Vector3<f64> {
        let mut normal = Vector3::zeros();
        for h in self.vertex_halfedges(v) {
            let f = self.face(h);
            if f.is_valid() {
                normal += self.face_normal(f) * self.angle_at_vertex(h);
            }
        }
        normal
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Average position of the valid vertices.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        let mut sum = Vector3::zeros();
        let mut count = 0usize;
        for v in self.vertices() {
            sum += self.position(v).coords;
            count += 1;
        }
        (count > 0).then(|| Point3::from(sum / count as f64))
    }

    /// Average length of the valid edges. Zero without edges.
    pub fn mean_edge_length(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for e in self.edges() {
            total += self.halfedge_length(e.halfedge());
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// Axis-aligned bounds of the valid vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.vertices();
        let first = *self.position(iter.next()?);
        let mut min = first;
        let mut max = first;

        for v in iter {
            let p = self.position(v);
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }

    /// Total area of the valid faces.
    pub fn surface_area(&self) -> f64 {
        self.faces().map(|f| self.face_area(f)).sum()
    }

    // ==================== Custom Properties ====================

    /// Attach a new per-vertex property, filled with `default`.
    pub fn add_vertex_property<T>(&mut self, name: &str, default: T) -> PropertyHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.vertex_props.add(name, default)
    }

    /// Typed access to a per-vertex property.
    pub fn vertex_property<T: 'static>(&self, handle: PropertyHandle<T>) -> Option<&Property<T>> {
        self.vertex_props.get(handle)
    }

    /// Typed mutable access to a per-vertex property.
    pub fn vertex_property_mut<T: 'static>(
        &mut self,
        handle: PropertyHandle<T>,
    ) -> Option<&mut Property<T>> {
        self.vertex_props.get_mut(handle)
    }

    /// All user-defined vertex properties.
    pub fn vertex_properties(&self) -> &PropertySet {
        &self.vertex_props
    }

    /// Attach a new per-halfedge property, filled with `default`.
    pub fn add_halfedge_property<T>(&mut self, name: &str, default: T) -> PropertyHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.halfedge_props.add(name, default)
    }

    /// Typed access to a per-halfedge property.
    pub fn halfedge_property<T: 'static>(&self, handle: PropertyHandle<T>) -> Option<&Property<T>> {
        self.halfedge_props.get(handle)
    }

    /// Typed mutable access to a per-halfedge property.
    pub fn halfedge_property_mut<T: 'static>(
        &mut self,
        handle: PropertyHandle<T>,
    ) -> Option<&mut Property<T>> {
        self.halfedge_props.get_mut(handle)
    }

    /// All user-defined halfedge properties.
    pub fn halfedge_properties(&self) -> &PropertySet {
        &self.halfedge_props
    }

    /// Attach a new per-face property, filled with `default`.
    pub fn add_face_property<T>(&mut self, name: &str, default: T) -> PropertyHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.face_props.add(name, default)
    }

    /// Typed access to a per-face property.
    pub fn face_property<T: 'static>(&self, handle: PropertyHandle<T>) -> Option<&Property<T>> {
        self.face_props.get(handle)
    }

    /// Typed mutable access to a per-face property.
    pub fn face_property_mut<T: 'static>(
        &mut self,
        handle: PropertyHandle<T>,
    ) -> Option<&mut Property<T>> {
        self.face_props.get_mut(handle)
    }

    /// All user-defined face properties.
    pub fn face_properties(&self) -> &PropertySet {
        &self.face_props
    }

    // ==================== Low-level Links ====================

    /// Set `next(h) = n` and `prev(n) = h`.
    #[inline]
    pub(crate) fn link(&mut self, h: HalfEdgeId<I>, n: HalfEdgeId<I>) {
        self.halfedges.get_mut(h.index()).next = n;
        self.halfedges.get_mut(n.index()).prev = h;
    }

    #[inline]
    pub(crate) fn set_vertex(&mut self, h: HalfEdgeId<I>, v: VertexId<I>) {
        self.halfedges.get_mut(h.index()).vertex = v;
    }

    #[inline]
    pub(crate) fn set_face(&mut self, h: HalfEdgeId<I>, f: FaceId<I>) {
        self.halfedges.get_mut(h.index()).face = f;
    }

    #[inline]
    pub(crate) fn set_vertex_halfedge(&mut self, v: VertexId<I>, h: HalfEdgeId<I>) {
        self.vertices.get_mut(v.index()).halfedge = h;
    }

    #[inline]
    pub(crate) fn set_face_halfedge(&mut self, f: FaceId<I>, h: HalfEdgeId<I>) {
        self.faces.get_mut(f.index()).halfedge = h;
    }

    /// Point a vertex at one of its boundary halfedges if it has any.
    pub(crate) fn adjust_vertex_halfedge(&mut self, v: VertexId<I>) {
        if let Some(h) = self.find_boundary_incoming(v) {
            self.set_vertex_halfedge(v, h);
        }
    }

    // ==================== Validation ====================

    /// Check that all connectivity is consistent.
    ///
    /// Verifies twin, next/prev and face agreement on every live halfedge,
    /// that every live vertex and face loop closes, and that boundary
    /// vertices store a boundary halfedge.
    pub fn is_valid(&self) -> bool {
        let limit = self.num_halfedges();

        for index in 0..self.num_halfedges() {
            let h = HalfEdgeId::<I>::new(index);
            if !self.is_halfedge_valid(h) {
                continue;
            }
            let twin = h.opposite();
            if !self.is_halfedge_valid(twin) || twin.opposite() != h {
                return false;
            }
            let (next, prev) = (self.next(h), self.prev(h));
            if !self.is_halfedge_valid(next) || !self.is_halfedge_valid(prev) {
                return false;
            }
            if self.prev(next) != h || self.next(prev) != h {
                return false;
            }
            if self.face(next) != self.face(h) {
                return false;
            }
            // Consecutive halfedges share a vertex.
            if self.source(next) != self.sink(h) {
                return false;
            }
            let f = self.face(h);
            if f.is_valid() && !self.is_face_valid(f) {
                return false;
            }
        }

        for index in 0..self.num_vertices() {
            let v = VertexId::<I>::new(index);
            if !self.is_vertex_valid(v) {
                continue;
            }
            let start = self.vertex_halfedge(v);
            if !self.is_halfedge_valid(start) || self.sink(start) != v {
                return false;
            }
            let mut h = start;
            let mut steps = 0;
            let mut has_boundary = false;
            loop {
                if self.sink(h) != v {
                    return false;
                }
                has_boundary |= self.is_boundary_halfedge(h);
                h = self.sink_ccw(h);
                steps += 1;
                if h == start {
                    break;
                }
                if steps > limit {
                    return false;
                }
            }
            if has_boundary && !self.is_boundary_halfedge(start) {
                return false;
            }
        }

        for index in 0..self.num_faces() {
            let f = FaceId::<I>::new(index);
            if !self.is_face_valid(f) {
                continue;
            }
            let start = self.face_halfedge(f);
            if !self.is_halfedge_valid(start) {
                return false;
            }
            let mut h = start;
            let mut steps = 0;
            loop {
                if self.face(h) != f {
                    return false;
                }
                h = self.next(h);
                steps += 1;
                if h == start {
                    break;
                }
                if steps > limit {
                    return false;
                }
            }
        }

        true
    }
}
