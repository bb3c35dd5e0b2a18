//! Incremental topology and geometry mutation.
//!
//! Every operation here either completes and leaves the mesh consistent, or
//! returns an error without touching it. Removal never compacts storage;
//! removed elements keep their slots with reset adjacency.

use nalgebra::{Point3, Vector3};

use super::halfedge::{FaceAdjacency, HalfEdgeAdjacency, HalfEdgeMesh, VertexAdjacency};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::observer::GeometryEvent;
use crate::error::{MeshError, Result};

/// Per-side bookkeeping of [`HalfEdgeMesh::add_face`].
#[derive(Clone, Copy)]
struct Side<I: MeshIndex> {
    halfedge: HalfEdgeId<I>,
    is_new: bool,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    // ==================== Construction ====================

    /// Add a new isolated vertex and return its ID.
    ///
    /// # Panics
    ///
    /// Panics if the index type has no slot left.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push_default();
        self.points.push_default();
        self.points.set(id.index(), position);
        self.vertex_props.extend();

        self.touch_topology();
        self.touch_geometry();
        self.notify(GeometryEvent::VertexAdded {
            vertex: id,
            position,
        });
        id
    }

    /// Append an unlinked twin pair of halfedges and return the even one.
    ///
    /// # Panics
    ///
    /// Panics if the index type has no slot left.
    pub fn add_edge(&mut self) -> HalfEdgeId<I> {
        let h = HalfEdgeId::new(self.halfedges.len());
        for _ in 0..2 {
            self.halfedges.push_default();
            self.halfedge_props.extend();
        }
        self.touch_topology();
        h
    }

    /// Append a twin pair going `from -> to`; returns the halfedge pointing to `to`.
    pub(crate) fn new_edge(&mut self, from: VertexId<I>, to: VertexId<I>) -> HalfEdgeId<I> {
        let h = self.add_edge();
        self.set_vertex(h, to);
        self.set_vertex(h.opposite(), from);
        h
    }

    /// Append a face slot pointing at `h`.
    pub(crate) fn new_face(&mut self, h: HalfEdgeId<I>) -> FaceId<I> {
        let f = FaceId::new(self.faces.len());
        self.faces.push_default();
        self.face_props.extend();
        self.set_face_halfedge(f, h);
        f
    }

    /// Insert a polygon bounded by `vertices` (in order).
    ///
    /// Missing edges are created. Existing edges must have a free (boundary)
    /// side facing the new polygon, and every vertex that already has edges
    /// must have room for another face in its fan. When two consecutive
    /// existing edges are not neighbours on the boundary, the patch between
    /// them is moved to another free gap around the shared vertex.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidArgument`] for fewer than three vertices,
    ///   unknown handles or a repeated vertex.
    /// - [`MeshError::InvalidTopology`] if the polygon would create a
    ///   non-manifold edge or vertex. The mesh is left unchanged.
    /// - [`MeshError::CapacityExceeded`] if the index type cannot address
    ///   the new halfedges or face.
    ///
    /// # Example
    /// ```
    /// use hemesh::mesh::HalfEdgeMesh;
    /// use nalgebra::Point3;
    ///
    /// let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
    /// let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
    /// let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
    /// let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
    ///
    /// let f = mesh.add_face(&[a, b, c]).unwrap();
    /// assert_eq!(mesh.face_size(f), 3);
    /// assert_eq!(mesh.num_edges(), 3);
    /// ```
    pub fn add_face(&mut self, vertices: &[VertexId<I>]) -> Result<FaceId<I>> {
        let n = vertices.len();
        if n < 3 {
            return Err(MeshError::InvalidArgument(format!(
                "a face needs at least 3 vertices, got {}",
                n
            )));
        }
        for (i, &v) in vertices.iter().enumerate() {
            if !self.contains_vertex(v) {
                return Err(MeshError::InvalidArgument(format!("unknown vertex {:?}", v)));
            }
            if vertices[..i].contains(&v) {
                return Err(MeshError::InvalidArgument(format!(
                    "vertex {:?} appears twice in the face",
                    v
                )));
            }
        }

        // Side i goes from vertices[i] to vertices[i + 1].
        let mut sides = Vec::with_capacity(n);
        for i in 0..n {
            let from = vertices[i];
            let to = vertices[(i + 1) % n];

            if self.is_vertex_valid(from) && self.find_boundary_incoming(from).is_none() {
                return Err(MeshError::InvalidTopology(format!(
                    "vertex {:?} has no free boundary gap",
                    from
                )));
            }

            let side = match self.find_halfedge(from, to) {
                Some(h) if !self.is_boundary_halfedge(h) => {
                    return Err(MeshError::InvalidTopology(format!(
                        "edge ({:?}, {:?}) already has a face on this side",
                        from, to
                    )));
                }
                Some(h) => Side {
                    halfedge: h,
                    is_new: false,
                },
                None => Side {
                    halfedge: HalfEdgeId::invalid(),
                    is_new: true,
                },
            };
            sides.push(side);
        }

        let new_sides = sides.iter().filter(|side| side.is_new).count();
        self.ensure_capacity(
            self.num_vertices(),
            self.num_halfedges() + 2 * new_sides,
            self.num_faces() + 1,
        )?;

        self.relink_patches(&sides)?;

        // From here on nothing can fail.
        for i in 0..n {
            if sides[i].is_new {
                sides[i].halfedge = self.new_edge(vertices[i], vertices[(i + 1) % n]);
            }
        }

        let f = self.new_face(sides[0].halfedge);
        let mut links: Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> = Vec::with_capacity(3 * n);

        for i in 0..n {
            let ii = (i + 1) % n;
            let v = vertices[ii];
            let inner_prev = sides[i].halfedge;
            let inner_next = sides[ii].halfedge;

            // Halfedges on the far side of the new face, around `v`.
            let outer_prev = inner_next.opposite();
            let outer_next = inner_prev.opposite();

            match (sides[i].is_new, sides[ii].is_new) {
                (true, false) => {
                    let boundary_prev = self.prev(inner_next);
                    links.push((boundary_prev, outer_next));
                    self.set_vertex_halfedge(v, boundary_prev);
                }
                (false, true) => {
                    let boundary_next = self.next(inner_prev);
                    links.push((outer_prev, boundary_next));
                    self.set_vertex_halfedge(v, outer_prev);
                }
                (true, true) => match self.find_boundary_incoming(v) {
                    None => {
                        links.push((outer_prev, outer_next));
                        self.set_vertex_halfedge(v, outer_prev);
                    }
                    Some(boundary_prev) => {
                        let boundary_next = self.next(boundary_prev);
                        links.push((boundary_prev, outer_next));
                        links.push((outer_prev, boundary_next));
                    }
                },
                (false, false) => {}
            }

            if sides[i].is_new || sides[ii].is_new {
                links.push((inner_prev, inner_next));
            }
        }

        for (h, next) in links {
            self.link(h, next);
        }
        for side in &sides {
            self.set_face(side.halfedge, f);
        }
        for &v in vertices {
            self.adjust_vertex_halfedge(v);
        }

        self.touch_topology();
        Ok(f)
    }

    /// Make consecutive existing sides of a new face adjacent on the boundary.
    ///
    /// Relinks are applied immediately so later sides see them; if any side
    /// cannot be fixed, everything done so far is rolled back.
    fn relink_patches(&mut self, sides: &[Side<I>]) -> Result<()> {
        let n = sides.len();
        let mut undo: Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> = Vec::new();

        for i in 0..n {
            let ii = (i + 1) % n;
            if sides[i].is_new || sides[ii].is_new {
                continue;
            }
            let inner_prev = sides[i].halfedge;
            let inner_next = sides[ii].halfedge;
            if self.next(inner_prev) == inner_next {
                continue;
            }

            // Search a free gap around the shared vertex, between
            // boundary_prev and boundary_next.
            let outer_prev = inner_next.opposite();
            let mut boundary_prev = outer_prev;
            let mut steps = 0;
            loop {
                boundary_prev = self.sink_cw(boundary_prev);
                steps += 1;
                if self.is_boundary_halfedge(boundary_prev) || steps > self.num_halfedges() {
                    break;
                }
            }

            if boundary_prev == inner_prev || !self.is_boundary_halfedge(boundary_prev) {
                for (h, next) in undo.into_iter().rev() {
                    self.link(h, next);
                }
                return Err(MeshError::InvalidTopology(format!(
                    "no free gap around vertex {:?} to relink the patch",
                    self.sink(inner_prev)
                )));
            }

            let boundary_next = self.next(boundary_prev);
            let patch_start = self.next(inner_prev);
            let patch_end = self.prev(inner_next);

            for (h, next) in [
                (boundary_prev, patch_start),
                (patch_end, boundary_next),
                (inner_prev, inner_next),
            ] {
                undo.push((h, self.next(h)));
                self.link(h, next);
            }
        }

        Ok(())
    }

    // ==================== Removal ====================

    /// Remove the edge containing `h`.
    ///
    /// If both sides of the edge belong to the same loop (a bridge, or a
    /// dangling edge), the loop is split around it and `true` is returned;
    /// endpoints left without edges become isolated. Otherwise the two loops
    /// merge and `false` is returned: two faces become one (the face of the
    /// twin survives), and a face next to the boundary is dissolved into it.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidArgument`] if `h` is not a live halfedge.
    pub fn remove_halfedge(&mut self, h: HalfEdgeId<I>) -> Result<bool> {
        if !self.is_halfedge_valid(h) {
            return Err(MeshError::InvalidArgument(format!("unknown halfedge {:?}", h)));
        }
        let ho = h.opposite();
        let f = self.face(h);
        let f2 = self.face(ho);
        let v = self.sink(h);
        let v2 = self.source(h);

        let h1p = self.prev(h);
        let h1n = self.next(ho);
        let h2p = self.prev(ho);
        let h2n = self.next(h);

        self.link(h1p, h1n);
        self.link(h2p, h2n);
        *self.halfedges.get_mut(h.index()) = HalfEdgeAdjacency::default();
        *self.halfedges.get_mut(ho.index()) = HalfEdgeAdjacency::default();

        let bridge = f == f2;
        if bridge {
            // The loop splits in two, or loses a dangling edge.
            let v2_isolated = h1p == ho;
            let v_isolated = h2n == ho;

            self.set_vertex_halfedge(
                v2,
                if v2_isolated { HalfEdgeId::invalid() } else { h1p },
            );
            self.set_vertex_halfedge(v, if v_isolated { HalfEdgeId::invalid() } else { h2p });

            if f.is_valid() {
                let survivor = [h1p, h2p, h1n, h2n]
                    .into_iter()
                    .find(|&x| x != h && x != ho)
                    .unwrap_or_else(HalfEdgeId::invalid);
                self.set_face_halfedge(f, survivor);
            }
        } else {
            self.set_vertex_halfedge(v, h2p);
            self.set_vertex_halfedge(v2, h1p);

            let merged = if f.is_valid() && f2.is_valid() {
                self.set_face_halfedge(f2, h1p);
                f2
            } else {
                FaceId::invalid()
            };
            let mut cur = h1p;
            loop {
                self.set_face(cur, merged);
                if !merged.is_valid() {
                    // Every corner of a dissolved face is now on the boundary.
                    self.set_vertex_halfedge(self.sink(cur), cur);
                }
                cur = self.next(cur);
                if cur == h1p {
                    break;
                }
            }
            for dead in [f, f2] {
                if dead.is_valid() && dead != merged {
                    self.set_face_halfedge(dead, HalfEdgeId::invalid());
                }
            }
        }

        for end in [v, v2] {
            if self.is_vertex_valid(end) {
                self.adjust_vertex_halfedge(end);
            }
        }

        self.touch_topology();
        Ok(bridge)
    }

    /// Remove every edge around a vertex, leaving it isolated.
    ///
    /// Faces around an interior vertex merge into a single face covering
    /// the hole. Listeners receive [`GeometryEvent::VertexWillBeRemoved`]
    /// first.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidArgument`] for the sentinel or an out-of-range
    /// handle.
    pub fn remove_vertex(&mut self, v: VertexId<I>) -> Result<()> {
        if !self.contains_vertex(v) {
            return Err(MeshError::InvalidArgument(format!("unknown vertex {:?}", v)));
        }
        self.notify(GeometryEvent::VertexWillBeRemoved { vertex: v });

        while self.vertex_halfedge(v).is_valid() {
            let h = self.vertex_halfedge(v);
            self.remove_halfedge(h)?;
        }
        *self.vertices.get_mut(v.index()) = VertexAdjacency::default();

        self.touch_topology();
        Ok(())
    }

    /// Remove a face, turning its loop into boundary.
    ///
    /// Halfedges are not relinked, so the loop becomes a hole with the
    /// same shape and [`Self::add_face`] on the same vertices restores it.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidArgument`] if `f` is not a live face.
    pub fn remove_face(&mut self, f: FaceId<I>) -> Result<()> {
        if !self.is_face_valid(f) {
            return Err(MeshError::InvalidArgument(format!("unknown face {:?}", f)));
        }
        let loop_halfedges: Vec<_> = self.face_halfedges(f).collect();
        for &h in &loop_halfedges {
            self.set_face(h, FaceId::invalid());
        }
        *self.faces.get_mut(f.index()) = FaceAdjacency::default();

        for &h in &loop_halfedges {
            self.set_vertex_halfedge(self.sink(h), h);
        }

        self.touch_topology();
        Ok(())
    }

    /// Drop every element.
    ///
    /// Registered user properties stay registered, with zero slots.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.points.clear();
        self.vertex_props.clear();
        self.clear_topology();

        self.touch_geometry();
        self.notify(GeometryEvent::VerticesCleared);
    }

    /// Drop every halfedge and face, keeping vertices (now isolated).
    pub fn clear_topology(&mut self) {
        self.halfedges.clear();
        self.faces.clear();
        self.halfedge_props.clear();
        self.face_props.clear();
        for adjacency in self.vertices.as_mut_slice() {
            *adjacency = VertexAdjacency::default();
        }
        self.touch_topology();
    }

    // ==================== Geometry ====================

    /// Move a vertex to a new position.
    ///
    /// Listeners receive [`GeometryEvent::VertexWillMove`] before the write.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidArgument`] for an unknown vertex.
    pub fn move_vertex(&mut self, v: VertexId<I>, to: Point3<f64>) -> Result<()> {
        if !self.contains_vertex(v) {
            return Err(MeshError::InvalidArgument(format!("unknown vertex {:?}", v)));
        }
        let from = *self.position(v);
        self.notify(GeometryEvent::VertexWillMove {
            vertex: v,
            from,
            to,
        });
        self.points.set(v.index(), to);
        self.touch_geometry();
        Ok(())
    }

    /// Move a vertex by an offset.
    pub fn translate_vertex(&mut self, v: VertexId<I>, offset: Vector3<f64>) -> Result<()> {
        if !self.contains_vertex(v) {
            return Err(MeshError::InvalidArgument(format!("unknown vertex {:?}", v)));
        }
        let to = self.position(v) + offset;
        self.move_vertex(v, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four vertices of a unit square.
    fn square_vertices(mesh: &mut HalfEdgeMesh) -> [VertexId; 4] {
        [
            mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_vertex(Point3::new(1.0, 1.0, 0.0)),
            mesh.add_vertex(Point3::new(0.0, 1.0, 0.0)),
        ]
    }

    /// A fan of `n` triangles around a centre vertex, closed if `closed`.
    fn fan(n: usize, closed: bool) -> (HalfEdgeMesh, VertexId, Vec<VertexId>) {
        let mut mesh = HalfEdgeMesh::new();
        let centre = mesh.add_vertex(Point3::origin());
        let rim: Vec<VertexId> = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                mesh.add_vertex(Point3::new(a.cos(), a.sin(), 0.0))
            })
            .collect();
        let count = if closed { n } else { n - 1 };
        for i in 0..count {
            mesh.add_face(&[centre, rim[i], rim[(i + 1) % n]]).unwrap();
        }
        (mesh, centre, rim)
    }

    #[test]
    fn test_add_edge_pairs() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        let h0 = mesh.add_edge();
        let h1 = mesh.add_edge();
        assert_eq!(h0.index(), 0);
        assert_eq!(h1.index(), 2);
        assert_eq!(mesh.num_halfedges(), 4);
        assert_eq!(mesh.num_edges(), 2);
    }

    #[test]
    fn test_single_quad() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);
        let f = mesh.add_face(&vs).unwrap();

        assert!(mesh.is_valid());
        assert_eq!(mesh.face_size(f), 4);
        assert_eq!(mesh.num_edges(), 4);
        for e in mesh.edges() {
            let h = e.halfedge();
            // Exactly one side is boundary.
            assert_ne!(
                mesh.is_boundary_halfedge(h),
                mesh.is_boundary_halfedge(h.opposite())
            );
        }
    }

    #[test]
    fn test_add_face_shares_edges() {
        let (mesh, centre, _) = fan(6, true);
        assert!(mesh.is_valid());
        assert_eq!(mesh.num_faces(), 6);
        assert_eq!(mesh.num_edges(), 12);
        assert_eq!(mesh.valence(centre), 6);
        assert!(!mesh.is_boundary_vertex(centre));
    }

    #[test]
    fn test_add_face_fills_open_fan() {
        let (mut mesh, centre, rim) = fan(5, false);
        assert!(mesh.is_boundary_vertex(centre));

        // Closing triangle reuses two existing edges.
        mesh.add_face(&[centre, rim[4], rim[0]]).unwrap();
        assert!(mesh.is_valid());
        assert!(!mesh.is_boundary_vertex(centre));
        assert_eq!(mesh.num_edges(), 10);
    }

    #[test]
    fn test_add_face_relinks_patch() {
        // Two separate triangles around the centre; a third one between
        // them, inserted out of order, forces the patch relink.
        let mut mesh = HalfEdgeMesh::new();
        let c = mesh.add_vertex(Point3::origin());
        let rim: Vec<VertexId> = (0..6)
            .map(|i| {
                let a = i as f64 / 6.0 * std::f64::consts::TAU;
                mesh.add_vertex(Point3::new(a.cos(), a.sin(), 0.0))
            })
            .collect();

        mesh.add_face(&[c, rim[0], rim[1]]).unwrap();
        mesh.add_face(&[c, rim[3], rim[4]]).unwrap();
        mesh.add_face(&[c, rim[1], rim[2]]).unwrap();
        mesh.add_face(&[c, rim[2], rim[3]]).unwrap();
        assert!(mesh.is_valid());
        mesh.add_face(&[c, rim[4], rim[5]]).unwrap();
        mesh.add_face(&[c, rim[5], rim[0]]).unwrap();

        assert!(mesh.is_valid());
        assert_eq!(mesh.valence(c), 6);
        assert!(!mesh.is_boundary_vertex(c));
    }

    #[test]
    fn test_add_face_rejects_third_face_on_edge() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);
        let apex = mesh.add_vertex(Point3::new(0.5, 0.5, 1.0));
        mesh.add_face(&[vs[0], vs[1], vs[2]]).unwrap();
        mesh.add_face(&[vs[2], vs[1], vs[3]]).unwrap();

        let before = (mesh.num_halfedges(), mesh.num_faces(), mesh.version());
        let err = mesh.add_face(&[vs[1], vs[2], apex]).unwrap_err();

        assert!(err.is_topology_error());
        assert_eq!(
            before,
            (mesh.num_halfedges(), mesh.num_faces(), mesh.version())
        );
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_add_face_rejects_closed_vertex() {
        let (mut mesh, centre, _) = fan(4, true);
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));
        let b = mesh.add_vertex(Point3::new(0.0, 1.0, 1.0));

        let err = mesh.add_face(&[centre, a, b]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology(_)));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_add_face_bad_arguments() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);

        assert!(mesh.add_face(&vs[..2]).is_err());
        assert!(mesh.add_face(&[vs[0], vs[1], vs[0]]).is_err());
        assert!(mesh
            .add_face(&[vs[0], vs[1], VertexId::invalid()])
            .is_err());
        assert!(mesh.add_face(&[vs[0], vs[1], VertexId::new(99)]).is_err());
        assert_eq!(mesh.num_faces(), 0);
    }

    #[test]
    fn test_add_face_reports_exhausted_index_space() {
        let mut mesh: HalfEdgeMesh<u16> = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        while mesh.num_halfedges() + 6 <= u16::MAX as usize - 1 {
            mesh.add_edge();
        }

        let before = (mesh.num_halfedges(), mesh.num_faces());
        let err = mesh.add_face(&[a, b, c]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::CapacityExceeded {
                element: "halfedge",
                ..
            }
        ));
        assert_eq!(before, (mesh.num_halfedges(), mesh.num_faces()));
    }

    #[test]
    fn test_remove_face_then_add_restores() {
        let (mut mesh, _, _) = fan(5, true);
        let f = FaceId::new(2);
        let loop_vertices: Vec<VertexId> = mesh.face_vertices(f).collect();
        let adjacency_before: Vec<_> = (0..mesh.num_halfedges())
            .map(|i| *mesh.halfedge_adjacency(HalfEdgeId::new(i)))
            .collect();

        mesh.remove_face(f).unwrap();
        assert!(!mesh.is_face_valid(f));
        assert!(mesh.is_valid());
        assert!(mesh.remove_face(f).is_err());

        let g = mesh.add_face(&loop_vertices).unwrap();
        assert!(mesh.is_valid());
        for (i, before) in adjacency_before.iter().enumerate() {
            let after = mesh.halfedge_adjacency(HalfEdgeId::new(i));
            assert_eq!(before.vertex, after.vertex);
            assert_eq!(before.next, after.next);
            assert_eq!(before.prev, after.prev);
            if before.face == f {
                assert_eq!(after.face, g);
            } else {
                assert_eq!(before.face, after.face);
            }
        }
    }

    #[test]
    fn test_remove_interior_edge_merges_faces() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);
        mesh.add_face(&[vs[0], vs[1], vs[2]]).unwrap();
        mesh.add_face(&[vs[0], vs[2], vs[3]]).unwrap();

        let diagonal = mesh.find_halfedge(vs[0], vs[2]).unwrap();
        let bridge = mesh.remove_halfedge(diagonal).unwrap();

        assert!(!bridge);
        assert!(mesh.is_valid());
        assert_eq!(mesh.faces().count(), 1);
        let f = mesh.faces().next().unwrap();
        assert_eq!(mesh.face_size(f), 4);
        assert!(!mesh.is_halfedge_valid(diagonal));
    }

    #[test]
    fn test_remove_boundary_edge_dissolves_face() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);
        mesh.add_face(&[vs[0], vs[1], vs[2]]).unwrap();

        let h = mesh.find_halfedge(vs[0], vs[1]).unwrap();
        assert!(!mesh.remove_halfedge(h).unwrap());

        assert!(mesh.is_valid());
        assert_eq!(mesh.faces().count(), 0);
        assert_eq!(mesh.edges().count(), 2);
        assert_eq!(mesh.valence(vs[2]), 2);
    }

    #[test]
    fn test_dissolve_face_moves_interior_corner_to_boundary() {
        for i in 0..6 {
            let (mut mesh, centre, rim) = fan(6, true);
            assert!(!mesh.is_boundary_vertex(centre));

            let h = mesh.find_halfedge(rim[i], rim[(i + 1) % 6]).unwrap();
            assert!(!mesh.remove_halfedge(h).unwrap());

            assert!(mesh.is_valid());
            assert!(mesh.is_boundary_vertex(centre));
            assert!(mesh.is_boundary_halfedge(mesh.vertex_halfedge(centre)));
            assert_eq!(mesh.faces().count(), 5);
        }
    }

    #[test]
    fn test_removal_sequence_on_strip_stays_valid() {
        let mut mesh = HalfEdgeMesh::new();
        let bottom: Vec<VertexId> = (0..4)
            .map(|i| mesh.add_vertex(Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let top: Vec<VertexId> = (0..4)
            .map(|i| mesh.add_vertex(Point3::new(i as f64, 1.0, 0.0)))
            .collect();
        for i in 0..3 {
            mesh.add_face(&[bottom[i], bottom[i + 1], top[i + 1], top[i]])
                .unwrap();
        }

        let h = mesh.find_halfedge(bottom[1], bottom[2]).unwrap();
        mesh.remove_halfedge(h).unwrap();
        assert!(mesh.is_valid());
        let h = mesh.find_halfedge(top[1], top[0]).unwrap();
        mesh.remove_halfedge(h).unwrap();
        assert!(mesh.is_valid());
        mesh.remove_vertex(top[3]).unwrap();
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_remove_dangling_edge_isolates_end() {
        let mut mesh = HalfEdgeMesh::new();
        let vs = square_vertices(&mut mesh);
        mesh.add_face(&[vs[0], vs[1], vs[2]]).unwrap();
        let h = mesh.find_halfedge(vs[0], vs[1]).unwrap();
        mesh.remove_halfedge(h).unwrap();

        // vs[0] -> vs[2] -> vs[1] is now a wire path; cut one end.
        let h = mesh.find_halfedge(vs[2], vs[0]).unwrap();
        assert!(mesh.remove_halfedge(h).unwrap());
        assert!(mesh.is_valid());
        assert!(!mesh.is_vertex_valid(vs[0]));
        assert!(mesh.is_vertex_valid(vs[2]));
        assert_eq!(mesh.valence(vs[2]), 1);
    }

    #[test]
    fn test_remove_vertex_interior() {
        let (mut mesh, centre, rim) = fan(6, true);
        mesh.remove_vertex(centre).unwrap();

        assert!(mesh.is_valid());
        assert!(!mesh.is_vertex_valid(centre));
        assert_eq!(mesh.faces().count(), 1);
        let f = mesh.faces().next().unwrap();
        assert_eq!(mesh.face_size(f), 6);
        for v in rim {
            assert_eq!(mesh.valence(v), 2);
        }
    }

    #[test]
    fn test_remove_vertex_boundary() {
        let (mut mesh, _, rim) = fan(4, false);
        mesh.remove_vertex(rim[0]).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(mesh.faces().count(), 2);
    }

    #[test]
    fn test_remove_vertex_invalid_handles() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        let v = mesh.add_vertex(Point3::origin());
        assert!(mesh.remove_vertex(VertexId::invalid()).is_err());
        assert!(mesh.remove_vertex(VertexId::new(7)).is_err());
        // Isolated vertices are accepted.
        assert!(mesh.remove_vertex(v).is_ok());
    }

    #[test]
    fn test_clear_topology_keeps_vertices() {
        let (mut mesh, _, _) = fan(4, true);
        let props = mesh.add_face_property("id", 0usize);
        mesh.clear_topology();

        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.face_property(props).unwrap().len(), 0);
        assert_eq!(mesh.vertices().count(), 0);
        assert!(mesh.is_valid());

        mesh.clear();
        assert_eq!(mesh.num_vertices(), 0);
    }

    #[test]
    fn test_move_and_translate() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        let v = mesh.add_vertex(Point3::origin());
        mesh.move_vertex(v, Point3::new(1.0, 2.0, 3.0)).unwrap();
        mesh.translate_vertex(v, Vector3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(mesh.vertex_point(v), Point3::new(2.0, 2.0, 3.0));
        assert!(mesh.move_vertex(VertexId::new(3), Point3::origin()).is_err());
    }
}
