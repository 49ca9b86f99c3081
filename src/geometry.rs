//! Derived geometry of a tissue mesh.
//!
//! Lengths, areas, volumes and heights are never stored on the mesh tables
//! themselves. [`update_all`] computes them in one pass from the positions and
//! the half-edge table and stamps the result with the mesh version, so a read
//! through [`Mesh::geometry`] after a later mutation fails with
//! [`MeshError::StaleGeometry`](crate::error::MeshError::StaleGeometry).
//!
//! # Fan decomposition
//!
//! Every face is split into one triangle per half-edge, `(c_f, r_s, r_t)`,
//! where `c_f` is the face centroid. The per-half-edge quantities below are
//! those of that triangle, and face and cell quantities are sums over them:
//!
//! - `fx = r_s - c_f`, `tx = r_t - c_f`
//! - `sub_normal = fx × tx` (twice the oriented triangle area)
//! - `sub_vol = c_f · (r_s × r_t) / 6` (signed tetrahedron volume with the origin)
//!
//! # Example
//!
//! ```
//! use epithelium::geometry;
//! use epithelium::mesh::generation;
//!
//! let mut cube = generation::unit_cube().unwrap();
//! geometry::update_all(&mut cube);
//! let geom = cube.geometry().unwrap();
//! assert!((geom.cell.vol[0] - 1.0).abs() < 1e-12);
//! assert!((geom.cell.area[0] - 6.0).abs() < 1e-12);
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::mesh::{mean_point, Mesh, MeshKind};

/// Tolerance below which a normal is treated as zero.
pub const EPS: f64 = 1e-12;

/// Per-vertex derived quantities.
#[derive(Debug, Clone, Default)]
pub struct VertGeometry {
    /// `z - basal_shift`.
    pub height: Vec<f64>,
    /// Incident to a half-edge without opposite.
    pub is_border: Vec<bool>,
}

/// Per-half-edge derived quantities.
#[derive(Debug, Clone, Default)]
pub struct EdgeGeometry {
    /// `r_t - r_s`.
    pub dx: Vec<Vector3<f64>>,
    /// `|dx|`.
    pub length: Vec<f64>,
    /// `r_s - c_f`.
    pub fx: Vec<Vector3<f64>>,
    /// `r_t - c_f`.
    pub tx: Vec<Vector3<f64>>,
    /// `fx × tx`.
    pub sub_normal: Vec<Vector3<f64>>,
    /// `c_f · (r_s × r_t) / 6`.
    pub sub_vol: Vec<f64>,
}

/// Per-face derived quantities.
#[derive(Debug, Clone, Default)]
pub struct FaceGeometry {
    /// Mean of the face vertices.
    pub centroid: Vec<Point3<f64>>,
    /// Sum of the sub-triangle normals (twice the vector area).
    pub normal: Vec<Vector3<f64>>,
    /// Area; signed in the xy plane for planar meshes.
    pub area: Vec<f64>,
    /// Sum of side lengths.
    pub perimeter: Vec<f64>,
    /// Mean height of the face vertices.
    pub height: Vec<f64>,
    /// `area × height`.
    pub vol: Vec<f64>,
    /// Number of sides.
    pub num_sides: Vec<usize>,
}

/// Per-cell derived quantities (bulk meshes).
#[derive(Debug, Clone, Default)]
pub struct CellGeometry {
    /// Mean of the distinct cell vertices.
    pub centroid: Vec<Point3<f64>>,
    /// Sum of face areas.
    pub area: Vec<f64>,
    /// Enclosed volume.
    pub vol: Vec<f64>,
    /// Number of faces.
    pub num_faces: Vec<usize>,
}

/// Snapshot of every derived quantity of a mesh.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Vertex table.
    pub vert: VertGeometry,
    /// Half-edge table.
    pub edge: EdgeGeometry,
    /// Face table.
    pub face: FaceGeometry,
    /// Cell table; empty on sheets.
    pub cell: CellGeometry,
    pub(crate) version: u64,
}

impl Geometry {
    /// Compute the geometry of `mesh` without storing it.
    pub fn compute(mesh: &Mesh) -> Self {
        let topo = mesh.topology();
        let pos = mesh.positions();
        let planar = mesh.kind() == MeshKind::Planar;

        // ==================== Edges ====================

        let dx: Vec<Vector3<f64>> = mesh
            .edge_ids()
            .map(|e| pos[mesh.trgt(e).index()] - pos[mesh.srce(e).index()])
            .collect();
        let length: Vec<f64> = dx.iter().map(|d| d.norm()).collect();

        // ==================== Faces ====================

        let face_centroid: Vec<Point3<f64>> = topo
            .face_edges
            .par_iter()
            .map(|edges| mean_point(edges.iter().map(|&e| pos[mesh.srce(e).index()])))
            .collect();

        let ne = mesh.ne();
        let mut fx = Vec::with_capacity(ne);
        let mut tx = Vec::with_capacity(ne);
        let mut sub_normal = Vec::with_capacity(ne);
        let mut sub_vol = Vec::with_capacity(ne);
        for e in mesh.edge_ids() {
            let c = face_centroid[mesh.edge_face(e).index()];
            let rs = pos[mesh.srce(e).index()];
            let rt = pos[mesh.trgt(e).index()];
            let f = rs - c;
            let t = rt - c;
            fx.push(f);
            tx.push(t);
            sub_normal.push(f.cross(&t));
            sub_vol.push(c.coords.dot(&rs.coords.cross(&rt.coords)) / 6.0);
        }

        let vert_height: Vec<f64> = pos.iter().map(|p| p.z - mesh.settings().basal_shift).collect();

        let nf = mesh.nf();
        let mut face = FaceGeometry {
            centroid: face_centroid,
            normal: vec![Vector3::zeros(); nf],
            area: vec![0.0; nf],
            perimeter: vec![0.0; nf],
            height: vec![0.0; nf],
            vol: vec![0.0; nf],
            num_sides: vec![0; nf],
        };
        for (fi, edges) in topo.face_edges.iter().enumerate() {
            for &e in edges {
                let i = e.index();
                let n = sub_normal[i];
                face.normal[fi] += n;
                face.area[fi] += if planar { 0.5 * n.z } else { 0.5 * n.norm() };
                face.perimeter[fi] += length[i];
                face.height[fi] += vert_height[mesh.srce(e).index()];
            }
            face.num_sides[fi] = edges.len();
            if !edges.is_empty() {
                face.height[fi] /= edges.len() as f64;
            }
            face.vol[fi] = face.area[fi] * face.height[fi];
        }

        // ==================== Vertices ====================

        let mut is_border = vec![false; mesh.nv()];
        for e in mesh.edge_ids().filter(|&e| mesh.is_border_edge(e)) {
            is_border[mesh.srce(e).index()] = true;
            is_border[mesh.trgt(e).index()] = true;
        }

        // ==================== Cells ====================

        let cell = if mesh.kind() == MeshKind::Bulk {
            let nc = mesh.nc();
            let mut cell = CellGeometry {
                centroid: Vec::with_capacity(nc),
                area: vec![0.0; nc],
                vol: vec![0.0; nc],
                num_faces: vec![0; nc],
            };
            for c in mesh.cell_ids() {
                let ci = c.index();
                let faces = mesh.cell_faces(c);
                cell.num_faces[ci] = faces.len();
                for &f in faces {
                    cell.area[ci] += face.area[f.index()];
                    for &e in mesh.face_edges(f) {
                        cell.vol[ci] += sub_vol[e.index()];
                    }
                }
                cell.centroid
                    .push(mean_point(mesh.cell_verts(c).iter().map(|&v| pos[v.index()])));
            }
            cell
        } else {
            CellGeometry::default()
        };

        log::trace!(
            "geometry pass over {} faces, {} cells at version {}",
            nf,
            cell.vol.len(),
            mesh.version()
        );

        Geometry {
            vert: VertGeometry {
                height: vert_height,
                is_border,
            },
            edge: EdgeGeometry {
                dx,
                length,
                fx,
                tx,
                sub_normal,
                sub_vol,
            },
            face,
            cell,
            version: mesh.version(),
        }
    }

    /// Unit face normal, or zero for a degenerate face.
    pub fn unit_normal(&self, face: usize) -> Vector3<f64> {
        self.face.normal[face]
            .try_normalize(EPS)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Unit vector along a half-edge, or zero for a collapsed one.
    pub fn unit_edge(&self, edge: usize) -> Vector3<f64> {
        self.edge.dx[edge]
            .try_normalize(EPS)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// Recompute every derived quantity of `mesh` and store it on the mesh.
///
/// Idempotent: running it twice in a row yields the same values.
pub fn update_all(mesh: &mut Mesh) {
    let geom = Geometry::compute(mesh);
    mesh.geometry = Some(geom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::specs::Settings;
    use crate::mesh::{extrude, generation, Segment, VertId};
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_signed_area() {
        let mut mesh = generation::square_pair().unwrap();
        update_all(&mut mesh);
        let geom = mesh.geometry().unwrap();
        assert_relative_eq!(geom.face.area[0], 1.0);
        assert_relative_eq!(geom.face.area[1], 1.0);
        assert_relative_eq!(geom.face.perimeter[0], 4.0);
        assert_eq!(geom.face.num_sides, vec![4, 4]);
        // every vertex of the pair touches the border
        assert!(geom.vert.is_border.iter().all(|&b| b));
        assert!(geom.cell.vol.is_empty());
    }

    #[test]
    fn test_planar_orientation_flips_sign() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let mut mesh = crate::mesh::build_sheet(MeshKind::Planar, &vertices, &[vec![0, 1, 2]]).unwrap();
        update_all(&mut mesh);
        assert_relative_eq!(mesh.geometry().unwrap().face.area[0], -0.5);
    }

    #[test]
    fn test_hexagon_area() {
        let mut mesh = generation::hexagonal_sheet(3, 3).unwrap();
        update_all(&mut mesh);
        let geom = mesh.geometry().unwrap();
        let expected = 1.5 * 3f64.sqrt();
        for &a in &geom.face.area {
            assert_relative_eq!(a, expected, epsilon = 1e-9);
        }
        // the centre hexagon is fully surrounded
        for v in mesh.face_verts(crate::mesh::FaceId::new(4)) {
            assert!(!geom.vert.is_border[v.index()]);
        }
    }

    #[test]
    fn test_prism_volume() {
        let sheet = generation::hexagonal_sheet(2, 2).unwrap();
        let mut mono = extrude(&sheet, 2.0).unwrap();
        update_all(&mut mono);
        let geom = mono.geometry().unwrap();
        let hexagon = 1.5 * 3f64.sqrt();
        for c in mono.cell_ids() {
            assert_relative_eq!(geom.cell.vol[c.index()], 2.0 * hexagon, epsilon = 1e-9);
            assert_eq!(geom.cell.num_faces[c.index()], 8);
        }
        // apical heights are z - basal_shift
        for v in mono.vert_ids() {
            if mono.vert_segment(v) == Segment::Apical {
                assert_relative_eq!(geom.vert.height[v.index()], 0.0);
            }
        }
    }

    #[test]
    fn test_volume_is_translation_invariant() {
        let mut cube = generation::unit_cube().unwrap();
        let shift = vec![Vector3::new(3.0, -2.0, 5.0); cube.nv()];
        cube.displace(&shift).unwrap();
        update_all(&mut cube);
        assert_relative_eq!(cube.geometry().unwrap().cell.vol[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stale_after_move() {
        let mut mesh = generation::square_pair().unwrap();
        update_all(&mut mesh);
        assert!(mesh.is_geometry_fresh());
        mesh.set_position(VertId::new(0), Point3::new(-1.0, 0.0, 0.0));
        assert!(mesh.geometry().is_err());
        update_all(&mut mesh);
        assert_relative_eq!(mesh.geometry().unwrap().face.area[0], 1.5);
    }

    #[test]
    fn test_degenerate_face_is_finite() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mut mesh = crate::mesh::build_sheet(MeshKind::Sheet, &vertices, &[vec![0, 1, 2]]).unwrap();
        update_all(&mut mesh);
        let geom = mesh.geometry().unwrap();
        assert_eq!(geom.face.area[0], 0.0);
        assert_eq!(geom.unit_normal(0), Vector3::zeros());
    }

    #[test]
    fn test_basal_shift() {
        let mut mesh = generation::unit_cube().unwrap();
        let settings = Settings {
            basal_shift: -1.0,
            ..mesh.settings().clone()
        };
        mesh.set_settings(settings);
        update_all(&mut mesh);
        let geom = mesh.geometry().unwrap();
        assert_relative_eq!(geom.vert.height[0], 1.0);
        assert_relative_eq!(geom.vert.height[4], 2.0);
    }
}
