//! Mesh construction utilities.
//!
//! This module builds half-edge tables from face-vertex lists (sheets) or
//! per-cell face lists (bulk), and extrudes a flat sheet into a monolayer.
//! Faces must be listed counter-clockwise when seen from outside their cell
//! (from +z for a sheet).

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};

use super::attributes::Segment;
use super::halfedge::{Mesh, MeshKind, Removal};
use super::index::{CellId, FaceId, VertId};
use crate::error::{MeshError, Result};

/// Build a sheet from vertices and polygonal faces.
///
/// # Arguments
/// * `kind` - [`MeshKind::Planar`] or [`MeshKind::Sheet`]
/// * `vertices` - List of vertex positions
/// * `faces` - List of faces, each as a cycle of vertex indices
///
/// # Example
/// ```
/// use epithelium::mesh::{build_sheet, MeshKind};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3]];
///
/// let mesh = build_sheet(MeshKind::Planar, &vertices, &faces).unwrap();
/// assert_eq!(mesh.nv(), 4);
/// assert_eq!(mesh.ne(), 4);
/// assert!(mesh.is_valid());
/// ```
pub fn build_sheet(kind: MeshKind, vertices: &[Point3<f64>], faces: &[Vec<usize>]) -> Result<Mesh> {
    if kind == MeshKind::Bulk {
        return Err(MeshError::UnsupportedKind {
            operation: "build_sheet",
            kind,
        });
    }
    check_faces(vertices.len(), faces.iter().map(Vec::as_slice))?;

    let mut mesh = Mesh::new(kind);
    for &pos in vertices {
        mesh.push_vertex(pos, Segment::Unset);
    }
    for face in faces {
        push_polygon(&mut mesh, face, CellId::invalid(), Segment::Unset);
    }
    finish(mesh)
}

/// Build a bulk mesh from cells, each given as a list of outward-oriented faces.
pub fn build_bulk(vertices: &[Point3<f64>], cells: &[Vec<Vec<usize>>]) -> Result<Mesh> {
    check_faces(
        vertices.len(),
        cells.iter().flat_map(|c| c.iter().map(Vec::as_slice)),
    )?;

    let mut mesh = Mesh::new(MeshKind::Bulk);
    for &pos in vertices {
        mesh.push_vertex(pos, Segment::Unset);
    }
    for faces in cells {
        let cell = mesh.push_cell(None);
        for face in faces {
            push_polygon(&mut mesh, face, cell, Segment::Unset);
        }
    }
    finish(mesh)
}

/// Extrude a sheet into a monolayer of prismatic cells.
///
/// Each sheet face becomes one cell: an apical face in place, a basal copy
/// `height` below it and one lateral quad per side. Segments are labelled and
/// the sheet settings are carried over.
pub fn extrude(sheet: &Mesh, height: f64) -> Result<Mesh> {
    if sheet.kind() == MeshKind::Bulk {
        return Err(MeshError::UnsupportedKind {
            operation: "extrude",
            kind: sheet.kind(),
        });
    }
    if height.is_nan() || height <= 0.0 {
        return Err(MeshError::invalid_param("height", height, "must be positive"));
    }

    let nv = sheet.nv();
    let shift = Vector3::new(0.0, 0.0, height);
    let mut mesh = Mesh::new(MeshKind::Bulk);
    mesh.set_settings(sheet.settings().clone());
    for v in sheet.vert_ids() {
        mesh.push_vertex(sheet.position(v), Segment::Apical);
    }
    for v in sheet.vert_ids() {
        mesh.push_vertex(sheet.position(v) - shift, Segment::Basal);
    }

    for f in sheet.face_ids() {
        let cell = mesh.push_cell(None);
        let apical: Vec<usize> = sheet.face_verts(f).iter().map(|v| v.index()).collect();
        let basal: Vec<usize> = apical.iter().rev().map(|&v| v + nv).collect();
        push_polygon(&mut mesh, &apical, cell, Segment::Apical);
        push_polygon(&mut mesh, &basal, cell, Segment::Basal);
        for &e in sheet.face_edges(f) {
            let (s, t) = (sheet.srce(e).index(), sheet.trgt(e).index());
            push_polygon(&mut mesh, &[t, s, s + nv, t + nv], cell, Segment::Lateral);
        }
    }
    finish(mesh)
}

/// Extract vertex positions and face cycles.
pub fn to_face_vertex(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_verts(f).iter().map(|v| v.index()).collect())
        .collect();
    (mesh.positions().to_vec(), faces)
}

fn check_faces<'a>(num_vertices: usize, faces: impl Iterator<Item = &'a [usize]>) -> Result<()> {
    let mut any = false;
    for (fi, face) in faces.enumerate() {
        any = true;
        if let Some(&vi) = face.iter().find(|&&vi| vi >= num_vertices) {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
        let distinct: HashSet<usize> = face.iter().copied().collect();
        if face.len() < 3 || distinct.len() != face.len() {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }
    if any {
        Ok(())
    } else {
        Err(MeshError::EmptyMesh)
    }
}

fn push_polygon(mesh: &mut Mesh, cycle: &[usize], cell: CellId, segment: Segment) -> FaceId {
    let face = mesh.push_face(segment, None);
    let n = cycle.len();
    for i in 0..n {
        mesh.push_edge(
            VertId::new(cycle[i]),
            VertId::new(cycle[(i + 1) % n]),
            face,
            cell,
            None,
        );
    }
    face
}

/// Drop unreferenced vertices and compute opposites.
fn finish(mut mesh: Mesh) -> Result<Mesh> {
    let mut removal = Removal::for_counts(mesh.counts());
    removal.verts.iter_mut().for_each(|r| *r = true);
    for (&s, &t) in mesh.srce.iter().zip(&mesh.trgt) {
        removal.verts[s.index()] = false;
        removal.verts[t.index()] = false;
    }
    let unused = removal.verts.iter().filter(|&&r| r).count();
    if unused > 0 {
        log::debug!("dropping {unused} unreferenced vertices");
    }
    mesh.compact(&removal);
    Ok(mesh)
}
