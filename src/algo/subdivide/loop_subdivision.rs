//! Loop subdivision for triangle meshes.

use nalgebra::{Point3, Vector3};

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

use super::{map_maybe_parallel, LoopValenceThreeRule, SubdivideOptions};

/// Performs Loop subdivision on a triangle mesh.
///
/// Each iteration quadruples the number of triangles.
///
/// # Arguments
///
/// * `mesh` - The mesh to subdivide (modified in place)
/// * `options` - Subdivision parameters
///
/// # Vertex Rules
///
/// - **Edge vertex**: `3/8 * (v0 + v1) + 1/8 * (v_left + v_right)`
/// - **Vertex of valence n**: `(1 - n*β) * v + β * Σ(neighbors)`, see [`loop_beta`]
///
/// Edges and vertices on a boundary use the crease rules `1/2 * (v0 + v1)`
/// and `3/4 * v + 1/8 * (left + right)`.
///
/// # Errors
///
/// - [`MeshError::InvalidArgument`] if a face is not a triangle.
/// - [`MeshError::CapacityExceeded`] if the index type cannot address the
///   refined mesh.
///
/// A failing iteration leaves the mesh as the previous one produced it.
pub fn loop_subdivide<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SubdivideOptions,
) -> Result<()> {
    for _ in 0..options.iterations {
        loop_subdivide_once(mesh, options)?;
    }
    Ok(())
}

/// Loop subdivision with progress reporting.
pub fn loop_subdivide_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SubdivideOptions,
    progress: &Progress,
) -> Result<()> {
    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Loop subdivision");
        loop_subdivide_once(mesh, options)?;
    }
    progress.report(options.iterations, options.iterations, "Loop subdivision");
    Ok(())
}

/// Neighbor weight `β` for a vertex of the given valence.
///
/// `3 / (8n)` in general. Valence three uses the rule selected in
/// [`SubdivideOptions::valence_three_rule`].
pub fn loop_beta(valence: usize, rule: LoopValenceThreeRule) -> f64 {
    match (valence, rule) {
        (0, _) => 0.0,
        (3, LoopValenceThreeRule::Textbook) => 3.0 / 16.0,
        (3, LoopValenceThreeRule::Legacy) => 3.0 / 16.0 * 3.0,
        (n, _) => 3.0 / (8.0 * n as f64),
    }
}

/// Perform one iteration of Loop subdivision.
fn loop_subdivide_once<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SubdivideOptions,
) -> Result<()> {
    if mesh.faces().next().is_none() {
        return Ok(());
    }
    if !mesh.is_triangle_mesh() {
        return Err(MeshError::InvalidArgument(
            "loop subdivision needs a triangle mesh".to_string(),
        ));
    }

    let num_vertices = mesh.num_vertices();
    let vertices: Vec<VertexId<I>> = mesh.vertices().collect();
    let edges: Vec<EdgeId<I>> = mesh.edges().collect();

    let source: &HalfEdgeMesh<I> = mesh;
    let rule = options.valence_three_rule;
    let vertex_points =
        map_maybe_parallel(&vertices, options.parallel, |&v| vertex_point(source, v, rule));
    let edge_points = map_maybe_parallel(&edges, options.parallel, |&e| edge_point(source, e));

    // Edge vertices are appended in edge order.
    let mut edge_vertex = vec![usize::MAX; source.num_edges()];
    for (k, e) in edges.iter().enumerate() {
        edge_vertex[e.index()] = num_vertices + k;
    }
    let ev = |h: HalfEdgeId<I>| edge_vertex[h.edge().index()];

    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(4 * source.num_faces());
    for f in source.faces() {
        let hs: Vec<_> = source.face_halfedges(f).collect();
        // Corner triangles
        for &h in &hs {
            triangles.push([source.sink(h).index(), ev(source.next(h)), ev(h)]);
        }
        // Center triangle
        triangles.push([ev(hs[0]), ev(hs[1]), ev(hs[2])]);
    }

    let old_faces = source.num_faces();
    source.ensure_capacity(
        num_vertices + edges.len(),
        2 * (2 * edges.len() + 3 * triangles.len() / 4),
        triangles.len(),
    )?;

    for (&v, &p) in vertices.iter().zip(&vertex_points) {
        mesh.move_vertex(v, p)?;
    }
    for &p in &edge_points {
        mesh.add_vertex(p);
    }
    mesh.rebuild_faces(&triangles)?;

    log::debug!(
        "loop subdivision: {} -> {} faces, {} vertices",
        old_faces,
        mesh.num_faces(),
        mesh.num_vertices()
    );
    Ok(())
}

/// New position of an original vertex.
fn vertex_point<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    v: VertexId<I>,
    rule: LoopValenceThreeRule,
) -> Point3<f64> {
    let p = mesh.vertex_point(v);

    if let Some(hb) = mesh.find_boundary_incoming(v) {
        let left = mesh.vertex_point(mesh.source(hb));
        let right = mesh.vertex_point(mesh.sink(mesh.next(hb)));
        return Point3::from(p.coords * 0.75 + (left.coords + right.coords) * 0.125);
    }

    let ring = mesh.vertex_one_ring(v);
    let n = ring.len();
    let beta = loop_beta(n, rule);
    let neighbor_sum: Vector3<f64> = ring.iter().map(|&u| mesh.position(u).coords).sum();

    Point3::from(p.coords * (1.0 - n as f64 * beta) + neighbor_sum * beta)
}

/// Position of the vertex inserted on an edge.
fn edge_point<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, e: EdgeId<I>) -> Point3<f64> {
    let h = e.halfedge();
    let o = h.opposite();
    if mesh.is_boundary_edge(h) {
        return mesh.halfedge_midpoint(h);
    }

    let a = mesh.position(mesh.source(h)).coords;
    let b = mesh.position(mesh.sink(h)).coords;
    let c = mesh.position(mesh.sink(mesh.next(h))).coords;
    let d = mesh.position(mesh.sink(mesh.next(o))).coords;

    Point3::from((a + b) * 0.375 + (c + d) * 0.125)
}
