//! Benchmarks for mesh operations.

use criterion::{criterion_group, criterion_main, Criterion};
use hemesh::algo::dec::{laplacian, mean_curvature_flow_step};
use hemesh::algo::subdivide::{catmull_clark_subdivide, loop_subdivide, SubdivideOptions};
use hemesh::prelude::*;
use nalgebra::Point3;

fn grid_data(n: usize) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    // Create grid vertices
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (i as f64, j as f64);
            vertices.push(Point3::new(x, y, 0.1 * (x * 0.7).sin() * (y * 0.3).cos()));
        }
    }

    // Create triangles
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    (vertices, faces)
}

fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
    let (vertices, faces) = grid_data(n);
    build_from_triangles(&vertices, &faces).unwrap()
}

fn bench_mesh_construction(c: &mut Criterion) {
    let (vertices, faces) = grid_data(10);
    c.bench_function("build_grid_10x10", |b| {
        b.iter(|| {
            let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
            mesh
        });
    });

    c.bench_function("add_face_grid_10x10", |b| {
        b.iter(|| {
            let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
            let ids: Vec<VertexId> = vertices.iter().map(|&p| mesh.add_vertex(p)).collect();
            for face in &faces {
                mesh.add_face(&[ids[face[0]], ids[face[1]], ids[face[2]]])
                    .unwrap();
            }
            mesh
        });
    });
}

fn bench_mesh_traversal(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("vertex_neighbors_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in mesh.vertices() {
                count += mesh.vertex_neighbors(v).count();
            }
            count
        });
    });

    c.bench_function("face_normals_all", |b| {
        b.iter(|| {
            let mut sum = nalgebra::Vector3::zeros();
            for f in mesh.faces() {
                sum += mesh.face_normal(f);
            }
            sum
        });
    });
}

fn bench_subdivision(c: &mut Criterion) {
    let mesh = create_grid_mesh(20);

    c.bench_function("loop_subdivide_20x20", |b| {
        b.iter(|| {
            let mut m = mesh.clone();
            loop_subdivide(&mut m, &SubdivideOptions::new(1)).unwrap();
            m
        });
    });

    c.bench_function("catmull_clark_20x20_sequential", |b| {
        b.iter(|| {
            let mut m = mesh.clone();
            catmull_clark_subdivide(&mut m, &SubdivideOptions::new(1).sequential()).unwrap();
            m
        });
    });
}

fn bench_dec(c: &mut Criterion) {
    let mesh = create_grid_mesh(30);

    c.bench_function("laplacian_30x30", |b| b.iter(|| laplacian(&mesh)));

    c.bench_function("mean_curvature_flow_step_30x30", |b| {
        b.iter(|| {
            let mut m = mesh.clone();
            mean_curvature_flow_step(&mut m, 0.01).unwrap();
            m
        });
    });
}

criterion_group!(
    benches,
    bench_mesh_construction,
    bench_mesh_traversal,
    bench_subdivision,
    bench_dec
);
criterion_main!(benches);
