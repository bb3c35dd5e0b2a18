//! Discrete exterior calculus operators.
//!
//! Sparse matrices over vertex and edge slots of a triangle mesh:
//!
//! - [`hodge_star_0`]: lumped vertex areas (`|V| x |V|`, diagonal)
//! - [`hodge_star_1`]: cotangent weights `0.5 (cot α + cot β)` (`|E| x |E|`, diagonal)
//! - [`exterior_derivative_0`]: signed edge-vertex incidence (`|E| x |V|`)
//! - [`laplacian`]: `d0ᵀ ⋆1 d0`, the positive semi-definite cotangent Laplacian
//!
//! Rows and columns of removed or isolated elements are zero. Built on
//! these, [`MeanCurvatureNormals`] estimates curvature and
//! [`mean_curvature_flow`] smooths a surface with implicit time steps.
//!
//! # Example
//!
//! ```
//! use hemesh::prelude::*;
//! use hemesh::algo::dec::laplacian;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! let l = laplacian(&mesh);
//! assert!(l.is_symmetric(1e-12));
//! ```

use nalgebra::{DMatrix, DVector, Point3, Vector3};

use crate::algo::sparse::{conjugate_gradient, CsrMatrix, EnvelopeCholesky};
use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Diagonal matrix of vertex areas (one third of the incident face areas).
pub fn hodge_star_0<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> CsrMatrix {
    let areas: Vec<f64> = (0..mesh.num_vertices())
        .map(|i| {
            let v = VertexId::new(i);
            if mesh.is_vertex_valid(v) {
                mesh.vertex_area(v)
            } else {
                0.0
            }
        })
        .collect();
    CsrMatrix::diagonal(&areas)
}

/// Diagonal matrix of cotangent edge weights.
///
/// Boundary edges get the single cotangent of their interior side.
pub fn hodge_star_1<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> CsrMatrix {
    let weights: Vec<f64> = (0..mesh.num_edges())
        .map(|k| {
            let e = EdgeId::new(k);
            if mesh.is_edge_valid(e) {
                let h = e.halfedge();
                0.5 * (mesh.halfedge_cotan(h) + mesh.halfedge_cotan(h.opposite()))
            } else {
                0.0
            }
        })
        .collect();
    CsrMatrix::diagonal(&weights)
}

/// Edge-vertex incidence: row `e` is `+1` at the sink and `-1` at the source
/// of the even halfedge of `e`.
pub fn exterior_derivative_0<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> CsrMatrix {
    let mut triplets = Vec::with_capacity(2 * mesh.num_edges());
    for e in mesh.edges() {
        let h = e.halfedge();
        triplets.push((e.index(), mesh.sink(h).index(), 1.0));
        triplets.push((e.index(), mesh.source(h).index(), -1.0));
    }
    CsrMatrix::from_triplets(mesh.num_edges(), mesh.num_vertices(), triplets)
}

/// Cotangent Laplacian `d0ᵀ ⋆1 d0`.
///
/// Symmetric with zero row sums. Off-diagonal entries are minus the edge
/// weights.
pub fn laplacian<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> CsrMatrix {
    let d0 = exterior_derivative_0(mesh);
    let star1 = hodge_star_1(mesh);
    d0.transpose().mul(&star1.mul(&d0))
}

/// Vertex positions as a `|V| x 3` matrix, one row per slot.
pub fn vertex_positions<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> DMatrix<f64> {
    let points = mesh.points();
    DMatrix::from_fn(points.len(), 3, |i, c| points[i][c])
}

/// Integrated mean curvature normals `L X`.
///
/// Row `v` approximates `2 H A n` at vertex `v`, with `A` its vertex area
/// and `n` the outward normal on a consistently oriented closed surface.
#[derive(Debug, Clone)]
pub struct MeanCurvatureNormals {
    vectors: DMatrix<f64>,
    areas: DVector<f64>,
}

impl MeanCurvatureNormals {
    /// Evaluate at every vertex slot of `mesh`.
    pub fn build<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Self {
        let vectors = laplacian(mesh).mul_dense(&vertex_positions(mesh));
        let areas = hodge_star_0(mesh).diagonal_values();
        Self { vectors, areas }
    }

    /// Number of vertex slots covered.
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    /// Whether no vertex slots are covered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The integrated curvature normal at `v`.
    pub fn vector<I: MeshIndex>(&self, v: VertexId<I>) -> Vector3<f64> {
        let i = v.index();
        Vector3::new(self.vectors[(i, 0)], self.vectors[(i, 1)], self.vectors[(i, 2)])
    }

    /// Unit normal at `v`. Zero where the surface is flat.
    pub fn normal<I: MeshIndex>(&self, v: VertexId<I>) -> Vector3<f64> {
        self.vector(v)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Mean curvature at `v`: the vector length over twice the vertex area.
    pub fn mean_curvature<I: MeshIndex>(&self, v: VertexId<I>) -> f64 {
        let area = self.areas[v.index()];
        if area <= f64::MIN_POSITIVE {
            return 0.0;
        }
        self.vector(v).norm() / (2.0 * area)
    }
}

/// Linear solver used by [`mean_curvature_flow`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowSolver {
    /// Direct envelope Cholesky factorization.
    Cholesky,

    /// Conjugate gradient, one solve per coordinate.
    ConjugateGradient {
        /// Maximum iterations per solve.
        max_iterations: usize,
        /// Relative residual tolerance.
        tolerance: f64,
    },
}

impl Default for FlowSolver {
    fn default() -> Self {
        FlowSolver::Cholesky
    }
}

/// Options for implicit mean curvature flow.
#[derive(Debug, Clone)]
pub struct MeanCurvatureFlowOptions {
    /// Time step of each implicit step.
    pub time_step: f64,

    /// Number of steps.
    pub iterations: usize,

    /// Linear solver for `(⋆0 + dt L) X = ⋆0 X_old`.
    pub solver: FlowSolver,
}

impl Default for MeanCurvatureFlowOptions {
    fn default() -> Self {
        Self {
            time_step: 1e-3,
            iterations: 1,
            solver: FlowSolver::Cholesky,
        }
    }
}

impl MeanCurvatureFlowOptions {
    /// Create options with the given time step.
    pub fn new(time_step: f64) -> Self {
        Self {
            time_step,
            ..Self::default()
        }
    }

    /// Set the number of steps.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the time step.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the linear solver.
    pub fn with_solver(mut self, solver: FlowSolver) -> Self {
        self.solver = solver;
        self
    }
}

/// One implicit mean curvature flow step with the direct solver.
///
/// Solves `(⋆0 + dt L) X_new = ⋆0 X_old` and writes the result back with
/// [`HalfEdgeMesh::move_vertex`]. Slots of removed or isolated vertices get
/// identity rows and keep their positions.
///
/// # Errors
///
/// - [`MeshError::InvalidParameter`] if `time_step` is not positive.
/// - [`MeshError::NumericalFailure`] if the system cannot be factored or
///   solved, for example on faces of zero area. Positions are unchanged.
pub fn mean_curvature_flow_step<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    time_step: f64,
) -> Result<()> {
    flow_step(mesh, time_step, FlowSolver::Cholesky)
}

/// Repeated implicit mean curvature flow steps.
///
/// Stops at the first failing step; earlier steps stay applied.
pub fn mean_curvature_flow<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &MeanCurvatureFlowOptions,
) -> Result<()> {
    for _ in 0..options.iterations {
        flow_step(mesh, options.time_step, options.solver)?;
    }
    Ok(())
}

/// Mean curvature flow with progress reporting.
pub fn mean_curvature_flow_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &MeanCurvatureFlowOptions,
    progress: &Progress,
) -> Result<()> {
    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Mean curvature flow");
        flow_step(mesh, options.time_step, options.solver)?;
    }
    progress.report(options.iterations, options.iterations, "Mean curvature flow");
    Ok(())
}

fn flow_step<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    time_step: f64,
    solver: FlowSolver,
) -> Result<()> {
    if !(time_step > 0.0 && time_step.is_finite()) {
        return Err(MeshError::invalid_param(
            "time_step",
            time_step,
            "must be positive and finite",
        ));
    }
    let n = mesh.num_vertices();
    if n == 0 {
        return Ok(());
    }

    // Pinned slots get a unit mass and no Laplacian coupling.
    let mass: Vec<f64> = (0..n)
        .map(|i| {
            let v = VertexId::<I>::new(i);
            if mesh.is_vertex_valid(v) {
                mesh.vertex_area(v)
            } else {
                1.0
            }
        })
        .collect();
    let m = CsrMatrix::diagonal(&mass);
    let system = m.add_scaled(time_step, &laplacian(mesh));
    let rhs = m.mul_dense(&vertex_positions(mesh));

    let solved = match solver {
        FlowSolver::Cholesky => {
            EnvelopeCholesky::factor(&system).and_then(|chol| chol.solve_matrix(&rhs))
        }
        FlowSolver::ConjugateGradient {
            max_iterations,
            tolerance,
        } => solve_columns_cg(&system, &rhs, &vertex_positions(mesh), max_iterations, tolerance),
    };
    let x = solved.map_err(|e| {
        if e.is_numerical() {
            log::warn!("mean curvature flow step failed: {}", e);
        }
        e
    })?;

    let before = mesh.surface_area();
    let valid: Vec<VertexId<I>> = mesh.vertices().collect();
    for v in valid {
        let i = v.index();
        mesh.move_vertex(v, Point3::new(x[(i, 0)], x[(i, 1)], x[(i, 2)]))?;
    }
    log::debug!(
        "mean curvature flow step: dt = {}, area {} -> {}",
        time_step,
        before,
        mesh.surface_area()
    );
    Ok(())
}

fn solve_columns_cg(
    a: &CsrMatrix,
    b: &DMatrix<f64>,
    guess: &DMatrix<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<DMatrix<f64>> {
    let mut x = DMatrix::zeros(b.nrows(), b.ncols());
    for c in 0..b.ncols() {
        let x0 = guess.column(c).into_owned();
        let col = conjugate_gradient(
            a,
            &b.column(c).into_owned(),
            Some(&x0),
            max_iterations,
            tolerance,
        )?;
        if !col.iter().all(|v| v.is_finite()) {
            return Err(MeshError::NumericalFailure(
                "solution has non-finite entries".to_string(),
            ));
        }
        x.set_column(c, &col);
    }
    Ok(x)
}
