//! Whole-mesh transformations.
//!
//! Operations that rewrite the connectivity of a mesh in one pass go
//! through a batch rebuild, so halfedge and face handles are not stable
//! across them and custom halfedge and face properties are reset. Vertex
//! handles and vertex properties survive, except for [`dual`] which
//! replaces every vertex.

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{to_face_vertex, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Flip the orientation of every face.
pub fn reverse_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    let (_, mut polygons) = to_face_vertex(mesh);
    for polygon in &mut polygons {
        polygon.reverse();
    }
    mesh.rebuild_faces(&polygons)?;
    Ok(())
}

/// Move every vertex by `direction`.
pub fn translate<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, direction: Vector3<f64>) -> Result<()> {
    let vertices: Vec<VertexId<I>> = mesh.vertex_ids().collect();
    for v in vertices {
        mesh.translate_vertex(v, direction)?;
    }
    Ok(())
}

/// Replace the mesh by its dual.
///
/// Each face becomes a vertex at its centroid and each vertex becomes a
/// face through the centroids of its incident faces, keeping the
/// orientation. Listeners see [`GeometryEvent::VerticesCleared`] followed
/// by one addition per dual vertex.
///
/// # Errors
///
/// [`MeshError::InvalidArgument`] if the mesh has a boundary or no faces.
///
/// [`GeometryEvent::VerticesCleared`]: crate::mesh::GeometryEvent::VerticesCleared
pub fn dual<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    if mesh.faces().next().is_none() || !mesh.is_closed() {
        return Err(MeshError::InvalidArgument(
            "the dual needs a closed mesh".to_string(),
        ));
    }

    let mut face_vertex = vec![usize::MAX; mesh.num_faces()];
    let mut centroids: Vec<Point3<f64>> = Vec::new();
    for f in mesh.faces() {
        face_vertex[f.index()] = centroids.len();
        centroids.push(mesh.face_centroid(f));
    }

    let polygons: Vec<Vec<usize>> = mesh
        .vertices()
        .map(|v| {
            mesh.vertex_halfedges(v)
                .map(|h| face_vertex[mesh.face(h).index()])
                .collect()
        })
        .collect();

    mesh.clear();
    for p in centroids {
        mesh.add_vertex(p);
    }
    mesh.add_faces(&polygons)?;
    Ok(())
}

/// Split every face with more than three sides into a triangle fan.
pub fn triangulate<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    if mesh.is_triangle_mesh() {
        return Ok(());
    }
    let triangles = mesh.triangle_indices();
    mesh.rebuild_faces(&triangles)?;
    Ok(())
}

/// Append the vertices and faces of `other`.
///
/// Vertex `i` of `other` becomes vertex `mesh.num_vertices() + i`; existing
/// handles stay valid. Faces are inserted one at a time.
pub fn add_mesh<I: MeshIndex, J: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    other: &HalfEdgeMesh<J>,
) -> Result<()> {
    let (points, polygons) = to_face_vertex(other);
    let offset = mesh.num_vertices();
    for p in points {
        mesh.add_vertex(p);
    }
    for polygon in polygons {
        let corners: Vec<VertexId<I>> = polygon.iter().map(|&i| VertexId::new(offset + i)).collect();
        mesh.add_face(&corners)?;
    }
    Ok(())
}

/// Bridge two faces of the same size with a ring of quads.
///
/// `h1` and `h2` pick the faces and how they line up: the first quad runs
/// `source(h1) -> sink(h1) -> source(h2) -> sink(h2)`. Both faces are
/// removed, then one quad is added per side while walking the first face
/// forwards and the second one backwards. Built on [`HalfEdgeMesh::remove_face`]
/// and [`HalfEdgeMesh::add_face`], so all other handles stay valid.
///
/// Returns the new quads, starting with the one on `h1`.
///
/// # Errors
///
/// - [`MeshError::InvalidArgument`] if a halfedge has no face, both lie on
///   the same face, the faces differ in size or share a vertex.
/// - [`MeshError::InvalidTopology`] if two corners to be joined already
///   share an edge.
///
/// The mesh is unchanged on error.
pub fn connect_faces<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    h1: HalfEdgeId<I>,
    h2: HalfEdgeId<I>,
) -> Result<Vec<FaceId<I>>> {
    for h in [h1, h2] {
        if !mesh.is_halfedge_valid(h) || mesh.is_boundary_halfedge(h) {
            return Err(MeshError::InvalidArgument(format!(
                "halfedge {:?} does not bound a face",
                h
            )));
        }
    }
    let (f1, f2) = (mesh.face(h1), mesh.face(h2));
    if f1 == f2 {
        return Err(MeshError::InvalidArgument(format!(
            "both halfedges lie on face {:?}",
            f1
        )));
    }

    let first: Vec<HalfEdgeId<I>> = mesh.loop_circulator(h1).collect();
    let mut second: Vec<HalfEdgeId<I>> = Vec::with_capacity(first.len());
    let mut h = h2;
    loop {
        second.push(h);
        h = mesh.prev(h);
        if h == h2 {
            break;
        }
    }
    if first.len() != second.len() {
        return Err(MeshError::InvalidArgument(format!(
            "faces have {} and {} sides",
            first.len(),
            second.len()
        )));
    }
    if first
        .iter()
        .any(|&a| second.iter().any(|&b| mesh.sink(a) == mesh.sink(b)))
    {
        return Err(MeshError::InvalidArgument(
            "faces to connect share a vertex".to_string(),
        ));
    }

    let quads: Vec<[VertexId<I>; 4]> = first
        .iter()
        .zip(&second)
        .map(|(&a, &b)| [mesh.source(a), mesh.sink(a), mesh.source(b), mesh.sink(b)])
        .collect();
    for q in &quads {
        if mesh.find_halfedge(q[1], q[2]).is_some() || mesh.find_halfedge(q[2], q[1]).is_some() {
            return Err(MeshError::InvalidTopology(format!(
                "vertices {:?} and {:?} are already joined",
                q[1], q[2]
            )));
        }
    }

    mesh.remove_face(f1)?;
    mesh.remove_face(f2)?;
    let mut faces = Vec::with_capacity(quads.len());
    for q in &quads {
        faces.push(mesh.add_face(q)?);
    }
    Ok(faces)
}

/// Halfedge of face `f` whose sink is closest to `point`.
///
/// Ties go to the first corner met from the face's stored halfedge.
///
/// # Errors
///
/// [`MeshError::InvalidArgument`] if `f` is not a live face.
pub fn nearest_vertex_in_face<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    point: &Point3<f64>,
    f: FaceId<I>,
) -> Result<HalfEdgeId<I>> {
    if !mesh.is_face_valid(f) {
        return Err(MeshError::InvalidArgument(format!("unknown face {:?}", f)));
    }
    let mut best = mesh.face_halfedge(f);
    let mut best_distance = f64::INFINITY;
    for h in mesh.face_halfedges(f) {
        let distance = (mesh.position(mesh.sink(h)) - point).norm_squared();
        if distance < best_distance {
            best = h;
            best_distance = distance;
        }
    }
    Ok(best)
}
