//! Mesh construction utilities.
//!
//! This module provides the batch constructor [`HalfEdgeMesh::add_faces`]
//! and the functions built on it for converting face-vertex lists, as
//! commonly found in mesh file formats, to and from half-edge meshes.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Outcome of a batch face insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddFacesReport<I: MeshIndex = u32> {
    /// The created faces, in input order.
    pub faces: Vec<FaceId<I>>,

    /// Boundary halfedges for which no neighbour on the boundary loop could
    /// be found. Empty for well-formed input.
    pub unmatched: Vec<HalfEdgeId<I>>,
}

impl<I: MeshIndex> AddFacesReport<I> {
    /// Whether every boundary halfedge was linked into a loop.
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Check a batch of polygons against a vertex count.
///
/// Returns the number of distinct edges the batch needs.
fn validate_polygons<P: AsRef<[usize]>>(num_vertices: usize, polygons: &[P]) -> Result<usize> {
    let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
    let mut directed: HashMap<(usize, usize), usize> = HashMap::new();

    for (fi, polygon) in polygons.iter().enumerate() {
        let polygon = polygon.as_ref();
        if polygon.len() < 3 {
            return Err(MeshError::DegenerateFace { face: fi });
        }
        for (i, &vi) in polygon.iter().enumerate() {
            if vi >= num_vertices {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
            if polygon[..i].contains(&vi) {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }

        let n = polygon.len();
        for i in 0..n {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            let count = uses.entry((a.min(b), a.max(b))).or_insert(0);
            *count += 1;
            if *count > 2 {
                return Err(MeshError::NonManifoldEdge {
                    v0: a.min(b),
                    v1: a.max(b),
                });
            }
            if let Some(other) = directed.insert((a, b), fi) {
                return Err(MeshError::InvalidTopology(format!(
                    "faces {} and {} both use the directed edge ({}, {}); \
                     orientations are inconsistent",
                    other, fi, a, b
                )));
            }
        }
    }

    Ok(uses.len())
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Insert many polygons at once, indexed by vertex slot.
    ///
    /// All polygons are validated before anything is created. Each unordered
    /// vertex pair gets one twin pair of halfedges, whose even member points
    /// from the lower to the higher vertex index. The sides left without a
    /// face are then linked into boundary loops by matching the end of one
    /// to the start of another.
    ///
    /// The mesh must not have any edges yet; use [`Self::add_face`] to grow
    /// an existing surface.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidArgument`] if the mesh already has edges.
    /// - [`MeshError::DegenerateFace`] for a polygon with fewer than three
    ///   or repeated vertices.
    /// - [`MeshError::InvalidVertexIndex`] for an unknown vertex.
    /// - [`MeshError::NonManifoldEdge`] if an edge would bound more than
    ///   two faces, [`MeshError::InvalidTopology`] if two polygons traverse
    ///   an edge in the same direction.
    /// - [`MeshError::CapacityExceeded`] if the index type cannot address
    ///   every halfedge and face of the batch.
    ///
    /// Unlinkable boundary halfedges are not an error: they are logged and
    /// listed in the returned report.
    pub fn add_faces<P: AsRef<[usize]>>(&mut self, polygons: &[P]) -> Result<AddFacesReport<I>> {
        if self.num_halfedges() > 0 {
            return Err(MeshError::InvalidArgument(
                "batch insertion needs a mesh without edges".to_string(),
            ));
        }
        let num_edges = validate_polygons(self.num_vertices(), polygons)?;
        self.ensure_capacity(self.num_vertices(), 2 * num_edges, polygons.len())?;

        let corner_count: usize = polygons.iter().map(|p| p.as_ref().len()).sum();
        self.reserve(0, corner_count + corner_count / 2, polygons.len());

        let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::new();
        let mut faces = Vec::with_capacity(polygons.len());

        for polygon in polygons {
            let polygon = polygon.as_ref();
            let n = polygon.len();

            let loop_halfedges: Vec<HalfEdgeId<I>> = (0..n)
                .map(|i| {
                    let (a, b) = (polygon[i], polygon[(i + 1) % n]);
                    let (lo, hi) = (a.min(b), a.max(b));
                    let even = *edge_map
                        .entry((lo, hi))
                        .or_insert_with(|| self.new_edge(VertexId::new(lo), VertexId::new(hi)));
                    if b == hi {
                        even
                    } else {
                        even.opposite()
                    }
                })
                .collect();

            let f = self.new_face(loop_halfedges[0]);
            for i in 0..n {
                let h = loop_halfedges[i];
                self.set_face(h, f);
                self.link(h, loop_halfedges[(i + 1) % n]);
                self.set_vertex_halfedge(self.sink(h), h);
            }
            faces.push(f);
        }

        let unmatched = self.stitch_boundary();
        if !unmatched.is_empty() {
            log::warn!(
                "add_faces: {} boundary halfedges could not be linked into loops",
                unmatched.len()
            );
        }

        self.touch_topology();
        Ok(AddFacesReport { faces, unmatched })
    }

    /// Replace all connectivity with `polygons`, keeping vertex slots.
    ///
    /// The polygons are checked against the current vertex count first, so
    /// on error the mesh is left untouched.
    pub(crate) fn rebuild_faces<P: AsRef<[usize]>>(
        &mut self,
        polygons: &[P],
    ) -> Result<AddFacesReport<I>> {
        let num_edges = validate_polygons(self.num_vertices(), polygons)?;
        self.ensure_capacity(self.num_vertices(), 2 * num_edges, polygons.len())?;
        self.clear_topology();
        self.add_faces(polygons)
    }

    /// Link every faceless halfedge into boundary loops.
    ///
    /// At a vertex with several boundary gaps (a bowtie), each fan of faces
    /// is walked from its outgoing boundary halfedge to its incoming one,
    /// and the end of every fan is linked to the start of the next, so the
    /// rotation around the vertex visits all of them. Returns the
    /// halfedges left without a partner.
    fn stitch_boundary(&mut self) -> Vec<HalfEdgeId<I>> {
        let mut incoming: HashMap<VertexId<I>, Vec<HalfEdgeId<I>>> = HashMap::new();
        let mut outgoing: HashMap<VertexId<I>, Vec<HalfEdgeId<I>>> = HashMap::new();

        for index in 0..self.num_halfedges() {
            let h = HalfEdgeId::<I>::new(index);
            if self.is_boundary_halfedge(h) {
                incoming.entry(self.sink(h)).or_default().push(h);
                outgoing.entry(self.source(h)).or_default().push(h);
            }
        }

        let mut unmatched = Vec::new();
        let mut vertices: Vec<_> = incoming.keys().chain(outgoing.keys()).copied().collect();
        vertices.sort();
        vertices.dedup();

        for v in vertices {
            let ins = incoming.remove(&v).unwrap_or_default();
            let outs = outgoing.remove(&v).unwrap_or_default();

            // (first outgoing, last incoming) boundary halfedge of each fan.
            let mut fans: Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> = Vec::with_capacity(outs.len());
            for &out in &outs {
                match self.fan_end(out) {
                    Some(end) if ins.contains(&end) => fans.push((out, end)),
                    _ => unmatched.push(out),
                }
            }
            unmatched.extend(
                ins.iter()
                    .filter(|h| !fans.iter().any(|&(_, end)| end == **h)),
            );

            for (k, &(_, end)) in fans.iter().enumerate() {
                let (start, _) = fans[(k + 1) % fans.len()];
                self.link(end, start);
            }

            if let Some(&(_, end)) = fans.first() {
                self.set_vertex_halfedge(v, end);
            }
        }

        unmatched
    }

    /// Last incoming boundary halfedge of the fan that starts at the
    /// outgoing boundary halfedge `out`, or `None` if the walk never
    /// reaches the boundary.
    fn fan_end(&self, out: HalfEdgeId<I>) -> Option<HalfEdgeId<I>> {
        let mut h = out.opposite();
        for _ in 0..self.num_halfedges() {
            if self.is_boundary_halfedge(h) {
                return Some(h);
            }
            h = self.sink_cw(h);
        }
        None
    }
}

/// Build a half-edge mesh from positions and polygons of any size.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `polygons` - List of faces, each a list of vertex indices
///
/// # Returns
/// A half-edge mesh, or an error if the input is invalid.
///
/// # Example
/// ```
/// use hemesh::mesh::{build_from_polygons, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.5, 2.0, 0.0),
/// ];
/// let polygons = vec![vec![0, 1, 2, 3], vec![3, 2, 4]];
///
/// let mesh: HalfEdgeMesh = build_from_polygons(&vertices, &polygons).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert_eq!(mesh.num_edges(), 6);
/// ```
pub fn build_from_polygons<I: MeshIndex, P: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    polygons: &[P],
) -> Result<HalfEdgeMesh<I>> {
    if polygons.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    validate_polygons(vertices.len(), polygons)?;

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), polygons.len());
    mesh.ensure_capacity(vertices.len(), 0, 0)?;
    for &p in vertices {
        mesh.add_vertex(p);
    }
    mesh.add_faces(polygons)?;
    Ok(mesh)
}

/// Build a half-edge mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use hemesh::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_polygons(vertices, faces)
}

/// Build a half-edge mesh from vertices and quad faces (counter-clockwise).
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_polygons(vertices, faces)
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns every vertex slot (so indices are stable) and the corner
/// indices of every live face.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let vertices = mesh.points().to_vec();
    let faces = mesh
        .faces()
        .map(|f| mesh.face_vertices(f).map(|v| v.index()).collect())
        .collect();
    (vertices, faces)
}
