//! Small generated tissues.
//!
//! Honeycomb sheets and a few fixed configurations, built in memory. Useful as
//! initial conditions and as test fixtures.

use std::collections::HashMap;

use nalgebra::Point3;

use super::builder::{build_bulk, build_sheet, extrude};
use super::halfedge::{Mesh, MeshKind};
use crate::error::Result;

/// Collects polygon corners, merging corners that coincide.
#[derive(Default)]
struct CornerPool {
    positions: Vec<Point3<f64>>,
    index: HashMap<(i64, i64, i64), usize>,
}

impl CornerPool {
    fn insert(&mut self, p: Point3<f64>) -> usize {
        let key = (
            (p.x * 1e6).round() as i64,
            (p.y * 1e6).round() as i64,
            (p.z * 1e6).round() as i64,
        );
        let positions = &mut self.positions;
        *self.index.entry(key).or_insert_with(|| {
            positions.push(p);
            positions.len() - 1
        })
    }

    /// Regular flat-topped or pointy-topped hexagon, counter-clockwise.
    fn hexagon(&mut self, center: Point3<f64>, radius: f64, phase: f64) -> Vec<usize> {
        (0..6)
            .map(|k| {
                let a = phase + k as f64 * std::f64::consts::FRAC_PI_3;
                self.insert(center + nalgebra::Vector3::new(radius * a.cos(), radius * a.sin(), 0.0))
            })
            .collect()
    }
}

/// A honeycomb of `nx × ny` regular hexagons with unit side, in the xy plane.
///
/// Rows are offset by half a cell, so for `nx, ny >= 3` the hexagon at
/// `(1, 1)` is fully surrounded.
pub fn hexagonal_sheet(nx: usize, ny: usize) -> Result<Mesh> {
    let mut pool = CornerPool::default();
    let dx = 3f64.sqrt();
    let mut faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let offset = if j % 2 == 1 { 0.5 } else { 0.0 };
            let center = Point3::new(dx * (i as f64 + offset), 1.5 * j as f64, 0.0);
            faces.push(pool.hexagon(center, 1.0, std::f64::consts::FRAC_PI_6));
        }
    }
    build_sheet(MeshKind::Sheet, &pool.positions, &faces)
}

/// Three unit hexagons sharing one central vertex.
pub fn three_faces_sheet() -> Result<Mesh> {
    let mut pool = CornerPool::default();
    let faces: Vec<Vec<usize>> = (0..3)
        .map(|k| {
            let a = k as f64 * 2.0 * std::f64::consts::FRAC_PI_3;
            let center = Point3::new(a.cos(), a.sin(), 0.0);
            pool.hexagon(center, 1.0, 0.0)
        })
        .collect();
    build_sheet(MeshKind::Sheet, &pool.positions, &faces)
}

/// Six equilateral triangles of side `side` around a central vertex.
pub fn hexagon_fan(side: f64) -> Result<Mesh> {
    let mut vertices = vec![Point3::origin()];
    for k in 0..6 {
        let a = k as f64 * std::f64::consts::FRAC_PI_3;
        vertices.push(Point3::new(side * a.cos(), side * a.sin(), 0.0));
    }
    let faces: Vec<Vec<usize>> = (0..6).map(|k| vec![0, 1 + k, 1 + (k + 1) % 6]).collect();
    build_sheet(MeshKind::Sheet, &vertices, &faces)
}

/// Two unit squares sharing an edge, as a planar mesh.
///
/// Vertices 1 and 4 lie on the shared junction.
pub fn square_pair() -> Result<Mesh> {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
    ];
    let faces = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
    build_sheet(MeshKind::Planar, &vertices, &faces)
}

/// A single unit cube cell.
pub fn unit_cube() -> Result<Mesh> {
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
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![1, 2, 6, 5],
        vec![2, 3, 7, 6],
        vec![3, 0, 4, 7],
    ];
    build_bulk(&vertices, &[faces])
}

/// Extruded honeycomb monolayer of `nx × ny` prismatic cells.
pub fn monolayer(nx: usize, ny: usize, height: f64) -> Result<Mesh> {
    extrude(&hexagonal_sheet(nx, ny)?, height)
}
