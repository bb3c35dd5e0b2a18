//! Catmull-Clark subdivision for polygon meshes.

use nalgebra::{Point3, Vector3};

use crate::algo::Progress;
use crate::error::Result;
use crate::mesh::{EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

use super::{map_maybe_parallel, SubdivideOptions};

/// Performs Catmull-Clark subdivision on a polygon mesh.
///
/// Works with any polygon mesh; after one iteration every face is a quad.
/// A face with k sides becomes k quads.
///
/// # Arguments
///
/// * `mesh` - The mesh to subdivide (modified in place)
/// * `options` - Subdivision parameters
///
/// # Vertex Rules
///
/// - **Face point**: centroid of the face's corners
/// - **Edge point**: average of both endpoints and both adjacent face points
/// - **Vertex point**: `(Q + 2R + (n - 3) S) / n`, where Q averages the
///   adjacent face points, R the adjacent edge points, S is the old
///   position and n the valence
///
/// Boundary edges take their midpoint and boundary vertices
/// `3/4 * v + 1/8 * (left + right)`.
///
/// New vertices are appended face points first, then edge points.
pub fn catmull_clark_subdivide<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SubdivideOptions,
) -> Result<()> {
    for _ in 0..options.iterations {
        catmull_clark_once(mesh, options.parallel)?;
    }
    Ok(())
}

/// Catmull-Clark subdivision with progress reporting.
pub fn catmull_clark_subdivide_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SubdivideOptions,
    progress: &Progress,
) -> Result<()> {
    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Catmull-Clark subdivision");
        catmull_clark_once(mesh, options.parallel)?;
    }
    progress.report(options.iterations, options.iterations, "Catmull-Clark subdivision");
    Ok(())
}

/// Perform one iteration of Catmull-Clark subdivision.
fn catmull_clark_once<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, parallel: bool) -> Result<()> {
    if mesh.faces().next().is_none() {
        return Ok(());
    }

    let num_vertices = mesh.num_vertices();
    let vertices: Vec<VertexId<I>> = mesh.vertices().collect();
    let edges: Vec<EdgeId<I>> = mesh.edges().collect();
    let faces: Vec<FaceId<I>> = mesh.faces().collect();

    let source: &HalfEdgeMesh<I> = mesh;

    // Face points, indexed by face slot.
    let face_points = map_maybe_parallel(&faces, parallel, |&f| source.face_centroid(f));
    let mut face_point_of = vec![Point3::origin(); source.num_faces()];
    let mut face_vertex = vec![usize::MAX; source.num_faces()];
    for (k, &f) in faces.iter().enumerate() {
        face_point_of[f.index()] = face_points[k];
        face_vertex[f.index()] = num_vertices + k;
    }

    // Edge points, indexed by edge slot.
    let edge_points = map_maybe_parallel(&edges, parallel, |&e| {
        edge_point(source, e, &face_point_of)
    });
    let mut edge_point_of = vec![Point3::origin(); source.num_edges()];
    let mut edge_vertex = vec![usize::MAX; source.num_edges()];
    for (k, &e) in edges.iter().enumerate() {
        edge_point_of[e.index()] = edge_points[k];
        edge_vertex[e.index()] = num_vertices + faces.len() + k;
    }

    let vertex_points = map_maybe_parallel(&vertices, parallel, |&v| {
        vertex_point(source, v, &face_point_of, &edge_point_of)
    });

    let ev = |h: HalfEdgeId<I>| edge_vertex[h.edge().index()];
    let mut quads: Vec<[usize; 4]> = Vec::new();
    for &f in &faces {
        for h in source.face_halfedges(f) {
            quads.push([
                ev(h),
                source.sink(h).index(),
                ev(source.next(h)),
                face_vertex[f.index()],
            ]);
        }
    }

    // Each old edge splits in two and every corner adds one interior edge.
    source.ensure_capacity(
        num_vertices + faces.len() + edges.len(),
        2 * (2 * edges.len() + quads.len()),
        quads.len(),
    )?;

    for (&v, &p) in vertices.iter().zip(&vertex_points) {
        mesh.move_vertex(v, p)?;
    }
    for &p in face_points.iter().chain(&edge_points) {
        mesh.add_vertex(p);
    }
    mesh.rebuild_faces(&quads)?;

    log::debug!(
        "catmull-clark subdivision: {} -> {} faces, {} vertices",
        faces.len(),
        quads.len(),
        mesh.num_vertices()
    );
    Ok(())
}

/// Position of the vertex inserted on an edge.
fn edge_point<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    e: EdgeId<I>,
    face_points: &[Point3<f64>],
) -> Point3<f64> {
    let h = e.halfedge();
    if mesh.is_boundary_edge(h) {
        return mesh.halfedge_midpoint(h);
    }

    let a = mesh.position(mesh.source(h)).coords;
    let b = mesh.position(mesh.sink(h)).coords;
    let f0 = face_points[mesh.face(h).index()].coords;
    let f1 = face_points[mesh.face(h.opposite()).index()].coords;
    Point3::from((a + b + f0 + f1) * 0.25)
}

/// New position of an original vertex.
fn vertex_point<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    v: VertexId<I>,
    face_points: &[Point3<f64>],
    edge_points: &[Point3<f64>],
) -> Point3<f64> {
    let s = mesh.vertex_point(v);

    if let Some(hb) = mesh.find_boundary_incoming(v) {
        let left = mesh.vertex_point(mesh.source(hb));
        let right = mesh.vertex_point(mesh.sink(mesh.next(hb)));
        return Point3::from(s.coords * 0.75 + (left.coords + right.coords) * 0.125);
    }

    let n = mesh.valence(v);
    if n == 0 {
        return s;
    }
    let nf = n as f64;

    let q: Vector3<f64> = mesh
        .vertex_faces(v)
        .map(|f| face_points[f.index()].coords)
        .sum::<Vector3<f64>>()
        / nf;
    let r: Vector3<f64> = mesh
        .vertex_halfedges(v)
        .map(|h| edge_points[h.edge().index()].coords)
        .sum::<Vector3<f64>>()
        / nf;

    Point3::from((q + r * 2.0 + s.coords * (nf - 3.0)) / nf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, build_from_quads};

    fn create_cube() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        build_from_quads(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_cube_counts() {
        let mut mesh = create_cube();
        catmull_clark_subdivide(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        // 8 corners + 6 face points + 12 edge points
        assert_eq!(mesh.num_vertices(), 26);
        assert_eq!(mesh.num_faces(), 24);
        assert_eq!(mesh.num_edges(), 48);
        assert!(mesh.is_valid());
        assert!(mesh.is_closed());
        assert!(mesh.is_quad_mesh());
    }

    #[test]
    fn test_quad_corners() {
        let mut mesh = create_cube();
        catmull_clark_subdivide(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        for f in mesh.faces() {
            let corners: Vec<usize> = mesh.face_vertices(f).map(|v| v.index()).collect();
            let original = corners.iter().filter(|&&i| i < 8).count();
            let face_points = corners.iter().filter(|&&i| (8..14).contains(&i)).count();
            let edge_points = corners.iter().filter(|&&i| i >= 14).count();
            assert_eq!((original, face_points, edge_points), (1, 1, 2));
        }
    }

    #[test]
    fn test_cube_positions() {
        let mut mesh = create_cube();
        catmull_clark_subdivide(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        // Bottom face point
        assert!((mesh.points()[8] - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);

        // Corner: Q = (1/3, 1/3, 1/3), R = (1/4, 1/4, 1/4), n = 3
        let c = 5.0 / 18.0;
        assert!((mesh.points()[0] - Point3::new(c, c, c)).norm() < 1e-12);

        // Edge (0, 1): average of its endpoints and two face points
        assert!(mesh
            .points()
            .iter()
            .any(|p| (p - Point3::new(0.5, 0.125, 0.125)).norm() < 1e-12));
    }

    #[test]
    fn test_two_iterations_shrink_towards_center() {
        let mut mesh = create_cube();
        catmull_clark_subdivide(&mut mesh, &SubdivideOptions::new(2).sequential()).unwrap();

        assert_eq!(mesh.num_faces(), 96);
        assert!(mesh.is_valid());

        let center = Point3::new(0.5, 0.5, 0.5);
        let max_dist = mesh
            .points()
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0, f64::max);
        assert!(max_dist < 3.0_f64.sqrt() / 2.0);
    }

    #[test]
    fn test_triangle_becomes_quads() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mut mesh: HalfEdgeMesh = build_from_polygons(&vertices, &[vec![0, 1, 2]]).unwrap();
        catmull_clark_subdivide(&mut mesh, &SubdivideOptions::new(1)).unwrap();

        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.num_vertices(), 7);
        assert!(mesh.is_quad_mesh());
        assert!(mesh.is_valid());
    }
}
