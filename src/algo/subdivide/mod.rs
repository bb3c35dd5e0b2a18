//! Mesh subdivision algorithms.
//!
//! Both schemes refine a mesh in place: new positions are computed from the
//! current mesh, the original vertices are moved (so listeners see every
//! change), new vertices are appended, and the connectivity is rebuilt in
//! one batch with [`HalfEdgeMesh::add_faces`](crate::mesh::HalfEdgeMesh::add_faces).
//!
//! # Loop Subdivision (Triangle Meshes)
//!
//! Loop subdivision (Loop, 1987) is an approximating subdivision scheme for
//! closed triangle meshes. Each iteration:
//!
//! 1. Inserts one vertex per edge at `3/8 (a + b) + 1/8 (c + d)`
//! 2. Moves each original vertex towards the average of its neighbors
//! 3. Splits each triangle into three corner triangles and one center triangle
//!
//! # Catmull-Clark Subdivision (Polygon Meshes)
//!
//! Catmull-Clark subdivision (Catmull & Clark, 1978) works on closed meshes
//! with faces of any size. Each iteration:
//!
//! 1. Creates a face point at each face centroid
//! 2. Creates edge points as the average of the endpoints and adjacent face points
//! 3. Moves original vertices to `(Q + 2R + (n - 3) S) / n`
//! 4. Replaces each k-gon by k quads
//!
//! # Example
//!
//! ```
//! use hemesh::prelude::*;
//! use hemesh::algo::subdivide::{loop_subdivide, SubdivideOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! loop_subdivide(&mut mesh, &SubdivideOptions::new(2)).unwrap();
//! assert_eq!(mesh.num_faces(), 64);
//! ```
//!
//! # References
//!
//! - Loop, C. (1987). "Smooth Subdivision Surfaces Based on Triangles."
//!   Master's thesis, University of Utah.
//! - Catmull, E. & Clark, J. (1978). "Recursively generated B-spline surfaces
//!   on arbitrary topological meshes." Computer-Aided Design, 10(6), 350-355.

mod catmull_clark;
mod loop_subdivision;

pub use catmull_clark::{catmull_clark_subdivide, catmull_clark_subdivide_with_progress};
pub use loop_subdivision::{loop_beta, loop_subdivide, loop_subdivide_with_progress};

/// Weight rule for valence-three vertices in Loop subdivision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopValenceThreeRule {
    /// `β = 3/16`, the usual special case.
    #[default]
    Textbook,

    /// `β = 3/16 · n`. Reproduces results from older tools that scaled the
    /// special case by the valence; it does not give a convex combination.
    Legacy,
}

/// Options for subdivision algorithms.
#[derive(Debug, Clone)]
pub struct SubdivideOptions {
    /// Number of subdivision iterations.
    pub iterations: usize,

    /// Weight used for valence-three vertices by Loop subdivision.
    pub valence_three_rule: LoopValenceThreeRule,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl SubdivideOptions {
    /// Create options with the specified number of iterations.
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            valence_three_rule: LoopValenceThreeRule::Textbook,
            parallel: true,
        }
    }

    /// Set the Loop weight rule for valence-three vertices.
    pub fn with_valence_three_rule(mut self, rule: LoopValenceThreeRule) -> Self {
        self.valence_three_rule = rule;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Map `f` over `items`, on the rayon pool when `parallel` is set.
pub(crate) fn map_maybe_parallel<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    use rayon::prelude::*;

    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}
