//! Energy terms of the vertex model.
//!
//! An [`Effector`] governs one element kind and returns one energy value per
//! element of that kind, together with the exact derivative of their sum with
//! respect to vertex positions.
//!
//! # Gradient layout
//!
//! Terms built on half-edge quantities report their gradient per half-edge, as
//! a pair of contributions to the source and target vertices
//! ([`Gradient::Edge`]). A vertex shared by many half-edges receives the sum of
//! its slots. Dependencies on a face centroid are spread evenly over the face
//! vertices through the source slot of each face half-edge, since every face
//! vertex is the source of exactly one of them.
//!
//! # Effectors
//!
//! | effector | element | energy |
//! |----------|---------|--------|
//! | [`LineTension`] | edge | `λ ℓ` |
//! | [`LengthElasticity`] | edge | `k (ℓ - ℓ0)²` |
//! | [`FaceAreaElasticity`] | face | `k (A - A0)²` |
//! | [`CellAreaElasticity`] | cell | `k (A - A0)²` |
//! | [`FaceVolumeElasticity`] | face | `k (A h - V0)²` |
//! | [`CellVolumeElasticity`] | cell | `k (V - V0)²` |
//! | [`FaceContractility`] | face | `Γ P²` |
//! | [`SurfaceTension`] | face | `σ A` |
//! | [`BorderElasticity`] | vert | `k |r - r0|²` on border vertices |
//! | [`RadialTension`] | vert | `τ h` |

use std::fmt;

use nalgebra::Vector3;

use super::specs::ParamSpec;
use crate::geometry::{Geometry, EPS};
use crate::mesh::{Attr, EdgeId, Element, Mesh, MeshKind};

/// Derivative of an energy term with respect to vertex positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    /// Per half-edge contributions to its source and target vertices.
    Edge {
        /// Added to the source vertex of each half-edge.
        srce: Vec<Vector3<f64>>,
        /// Added to the target vertex of each half-edge.
        trgt: Vec<Vector3<f64>>,
    },
    /// Per vertex derivatives.
    Vertex(Vec<Vector3<f64>>),
}

impl Gradient {
    fn edge_zeros(ne: usize) -> Self {
        Gradient::Edge {
            srce: vec![Vector3::zeros(); ne],
            trgt: vec![Vector3::zeros(); ne],
        }
    }

    /// Add the per-vertex gradient to `out`, which has one entry per vertex.
    pub fn accumulate(&self, mesh: &Mesh, out: &mut [Vector3<f64>]) {
        match self {
            Gradient::Edge { srce, trgt } => {
                for e in mesh.edge_ids() {
                    out[mesh.srce(e).index()] += srce[e.index()];
                    out[mesh.trgt(e).index()] += trgt[e.index()];
                }
            }
            Gradient::Vertex(grad) => {
                for (o, g) in out.iter_mut().zip(grad) {
                    *o += g;
                }
            }
        }
    }

    /// The per-vertex gradient.
    pub fn per_vertex(&self, mesh: &Mesh) -> Vec<Vector3<f64>> {
        let mut out = vec![Vector3::zeros(); mesh.nv()];
        self.accumulate(mesh, &mut out);
        out
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&mut self, factor: f64) {
        let rows: Vec<&mut Vec<Vector3<f64>>> = match self {
            Gradient::Edge { srce, trgt } => vec![srce, trgt],
            Gradient::Vertex(grad) => vec![grad],
        };
        for row in rows {
            row.iter_mut().for_each(|g| *g *= factor);
        }
    }
}

/// One energy term of the model.
///
/// Effectors hold no parameters of their own: every coefficient is read from
/// the attribute columns of the mesh they are evaluated on.
pub trait Effector: Send + Sync + fmt::Debug {
    /// Unique name of the term.
    fn label(&self) -> &'static str;

    /// Element kind the energy is summed over.
    fn element(&self) -> Element;

    /// Attributes read by the term, with their default values.
    fn attributes(&self) -> &'static [(Attr, f64)];

    /// Energy of every governed element.
    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64>;

    /// Derivative of the summed energy.
    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient;

    /// Default parameter spec of the term.
    fn specs(&self) -> ParamSpec {
        let mut spec = ParamSpec::default();
        for &(attr, value) in self.attributes() {
            spec.set(self.element(), attr.name(), value);
        }
        spec
    }
}

// ==================== Shared derivatives ====================

fn unit(v: Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(EPS).unwrap_or_else(Vector3::zeros)
}

/// Derivative of the area of each half-edge's face, per half-edge slot.
fn face_area_gradient(mesh: &Mesh, geom: &Geometry) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
    let ne = mesh.ne();
    let mut srce = vec![Vector3::zeros(); ne];
    let mut trgt = vec![Vector3::zeros(); ne];
    let (fx, tx) = (&geom.edge.fx, &geom.edge.tx);

    if mesh.kind() == MeshKind::Planar {
        // signed area; centroid terms cancel around a closed cycle
        for e in 0..ne {
            srce[e] = 0.5 * Vector3::new(tx[e].y, -tx[e].x, 0.0);
            trgt[e] = 0.5 * Vector3::new(-fx[e].y, fx[e].x, 0.0);
        }
        return (srce, trgt);
    }

    for edges in &mesh.topology().face_edges {
        let mut centroid = Vector3::zeros();
        for &e in edges {
            let i = e.index();
            let n = unit(geom.edge.sub_normal[i]);
            let ds = 0.5 * tx[i].cross(&n);
            let dt = 0.5 * n.cross(&fx[i]);
            srce[i] += ds;
            trgt[i] += dt;
            centroid -= ds + dt;
        }
        spread(&mut srce, edges, centroid);
    }
    (srce, trgt)
}

/// Derivative of the volume of each half-edge's cell, per half-edge slot.
fn cell_volume_gradient(mesh: &Mesh, geom: &Geometry) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
    let ne = mesh.ne();
    let mut srce = vec![Vector3::zeros(); ne];
    let mut trgt = vec![Vector3::zeros(); ne];
    let pos = mesh.positions();

    for (fi, edges) in mesh.topology().face_edges.iter().enumerate() {
        let c = geom.face.centroid[fi].coords;
        let mut centroid = Vector3::zeros();
        for &e in edges {
            let i = e.index();
            let rs = pos[mesh.srce(e).index()].coords;
            let rt = pos[mesh.trgt(e).index()].coords;
            srce[i] += rt.cross(&c) / 6.0;
            trgt[i] += c.cross(&rs) / 6.0;
            centroid += rs.cross(&rt) / 6.0;
        }
        spread(&mut srce, edges, centroid);
    }
    (srce, trgt)
}

/// Share a face-centroid derivative among the face vertices.
fn spread(srce: &mut [Vector3<f64>], edges: &[EdgeId], centroid: Vector3<f64>) {
    if edges.is_empty() {
        return;
    }
    let share = centroid / edges.len() as f64;
    for &e in edges {
        srce[e.index()] += share;
    }
}

/// Scale each half-edge slot by the factor of the element owning it.
fn weighted(
    mesh: &Mesh,
    (mut srce, mut trgt): (Vec<Vector3<f64>>, Vec<Vector3<f64>>),
    owner: impl Fn(EdgeId) -> Option<usize>,
    factor: &[f64],
) -> Gradient {
    for e in mesh.edge_ids() {
        let w = owner(e).map_or(0.0, |o| factor[o]);
        srce[e.index()] *= w;
        trgt[e.index()] *= w;
    }
    Gradient::Edge { srce, trgt }
}

/// `k (x - x0)²` and its derivative `2 k (x - x0)`.
fn elastic(k: &[f64], x: &[f64], x0: &[f64]) -> (Vec<f64>, Vec<f64>) {
    k.iter()
        .zip(x)
        .zip(x0)
        .map(|((&k, &x), &x0)| (k * (x - x0).powi(2), 2.0 * k * (x - x0)))
        .unzip()
}

fn length_slots(geom: &Geometry, weight: impl Fn(usize) -> f64) -> Gradient {
    let (srce, trgt) = (0..geom.edge.dx.len())
        .map(|e| {
            let g = weight(e) * unit(geom.edge.dx[e]);
            (-g, g)
        })
        .unzip();
    Gradient::Edge { srce, trgt }
}

// ==================== Edge terms ====================

/// Tension along every junction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTension;

impl Effector for LineTension {
    fn label(&self) -> &'static str {
        "line_tension"
    }

    fn element(&self) -> Element {
        Element::Edge
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::LineTension, 1e-2)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        let tension = mesh.attr(Element::Edge, Attr::LineTension);
        tension.iter().zip(&geom.edge.length).map(|(t, l)| t * l).collect()
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let tension = mesh.attr(Element::Edge, Attr::LineTension);
        length_slots(geom, |e| tension[e])
    }
}

/// Spring on every junction length.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthElasticity;

impl Effector for LengthElasticity {
    fn label(&self) -> &'static str {
        "length_elasticity"
    }

    fn element(&self) -> Element {
        Element::Edge
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::LengthElasticity, 1.0), (Attr::PreferedLength, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        elastic(
            mesh.attr(Element::Edge, Attr::LengthElasticity),
            &geom.edge.length,
            mesh.attr(Element::Edge, Attr::PreferedLength),
        )
        .0
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let (_, d) = elastic(
            mesh.attr(Element::Edge, Attr::LengthElasticity),
            &geom.edge.length,
            mesh.attr(Element::Edge, Attr::PreferedLength),
        );
        length_slots(geom, |e| d[e])
    }
}

// ==================== Face terms ====================

/// Elastic restoring force on face areas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceAreaElasticity;

impl Effector for FaceAreaElasticity {
    fn label(&self) -> &'static str {
        "face_area_elasticity"
    }

    fn element(&self) -> Element {
        Element::Face
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::AreaElasticity, 1.0), (Attr::PreferedArea, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        elastic(
            mesh.attr(Element::Face, Attr::AreaElasticity),
            &geom.face.area,
            mesh.attr(Element::Face, Attr::PreferedArea),
        )
        .0
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let (_, d) = elastic(
            mesh.attr(Element::Face, Attr::AreaElasticity),
            &geom.face.area,
            mesh.attr(Element::Face, Attr::PreferedArea),
        );
        weighted(
            mesh,
            face_area_gradient(mesh, geom),
            |e| Some(mesh.edge_face(e).index()),
            &d,
        )
    }
}

/// Elastic restoring force on the volume of a sheet cell, `area × height`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceVolumeElasticity;

impl Effector for FaceVolumeElasticity {
    fn label(&self) -> &'static str {
        "face_volume_elasticity"
    }

    fn element(&self) -> Element {
        Element::Face
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::VolElasticity, 1.0), (Attr::PreferedVol, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        elastic(
            mesh.attr(Element::Face, Attr::VolElasticity),
            &geom.face.vol,
            mesh.attr(Element::Face, Attr::PreferedVol),
        )
        .0
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let (_, d) = elastic(
            mesh.attr(Element::Face, Attr::VolElasticity),
            &geom.face.vol,
            mesh.attr(Element::Face, Attr::PreferedVol),
        );
        let (mut srce, mut trgt) = face_area_gradient(mesh, geom);
        let ez = Vector3::z();
        for (fi, edges) in mesh.topology().face_edges.iter().enumerate() {
            let (area, height) = (geom.face.area[fi], geom.face.height[fi]);
            // d(A h) = h dA + A dh, with dh/dz_v = 1/n for every face vertex
            let dh = ez * (area / edges.len().max(1) as f64);
            for &e in edges {
                let i = e.index();
                srce[i] = d[fi] * (height * srce[i] + dh);
                trgt[i] = d[fi] * height * trgt[i];
            }
        }
        Gradient::Edge { srce, trgt }
    }
}

/// Perimeter contractility of the actomyosin ring.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceContractility;

impl Effector for FaceContractility {
    fn label(&self) -> &'static str {
        "face_contractility"
    }

    fn element(&self) -> Element {
        Element::Face
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::Contractility, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        let gamma = mesh.attr(Element::Face, Attr::Contractility);
        gamma
            .iter()
            .zip(&geom.face.perimeter)
            .map(|(g, p)| g * p * p)
            .collect()
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let gamma = mesh.attr(Element::Face, Attr::Contractility);
        length_slots(geom, |e| {
            let f = mesh.edge_face(EdgeId::new(e)).index();
            2.0 * gamma[f] * geom.face.perimeter[f]
        })
    }
}

/// Tension proportional to face area.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceTension;

impl Effector for SurfaceTension {
    fn label(&self) -> &'static str {
        "surface_tension"
    }

    fn element(&self) -> Element {
        Element::Face
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::SurfaceTension, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        let sigma = mesh.attr(Element::Face, Attr::SurfaceTension);
        sigma.iter().zip(&geom.face.area).map(|(s, a)| s * a).collect()
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        weighted(
            mesh,
            face_area_gradient(mesh, geom),
            |e| Some(mesh.edge_face(e).index()),
            mesh.attr(Element::Face, Attr::SurfaceTension),
        )
    }
}

// ==================== Cell terms ====================

/// Elastic restoring force on the total area of a cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellAreaElasticity;

impl Effector for CellAreaElasticity {
    fn label(&self) -> &'static str {
        "cell_area_elasticity"
    }

    fn element(&self) -> Element {
        Element::Cell
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::AreaElasticity, 1.0), (Attr::PreferedArea, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        elastic(
            mesh.attr(Element::Cell, Attr::AreaElasticity),
            &geom.cell.area,
            mesh.attr(Element::Cell, Attr::PreferedArea),
        )
        .0
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        if mesh.nc() == 0 {
            return Gradient::edge_zeros(mesh.ne());
        }
        let (_, d) = elastic(
            mesh.attr(Element::Cell, Attr::AreaElasticity),
            &geom.cell.area,
            mesh.attr(Element::Cell, Attr::PreferedArea),
        );
        weighted(
            mesh,
            face_area_gradient(mesh, geom),
            |e| mesh.edge_cell(e).map(|c| c.index()),
            &d,
        )
    }
}

/// Elastic restoring force on cell volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellVolumeElasticity;

impl Effector for CellVolumeElasticity {
    fn label(&self) -> &'static str {
        "cell_volume_elasticity"
    }

    fn element(&self) -> Element {
        Element::Cell
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::VolElasticity, 1.0), (Attr::PreferedVol, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        elastic(
            mesh.attr(Element::Cell, Attr::VolElasticity),
            &geom.cell.vol,
            mesh.attr(Element::Cell, Attr::PreferedVol),
        )
        .0
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        if mesh.nc() == 0 {
            return Gradient::edge_zeros(mesh.ne());
        }
        let (_, d) = elastic(
            mesh.attr(Element::Cell, Attr::VolElasticity),
            &geom.cell.vol,
            mesh.attr(Element::Cell, Attr::PreferedVol),
        );
        weighted(
            mesh,
            cell_volume_gradient(mesh, geom),
            |e| mesh.edge_cell(e).map(|c| c.index()),
            &d,
        )
    }
}

// ==================== Vertex terms ====================

/// Spring pinning the free border of a sheet to rest positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorderElasticity;

impl BorderElasticity {
    fn offsets(mesh: &Mesh, geom: &Geometry) -> Vec<Vector3<f64>> {
        let rest = [
            mesh.attr(Element::Vert, Attr::RestX),
            mesh.attr(Element::Vert, Attr::RestY),
            mesh.attr(Element::Vert, Attr::RestZ),
        ];
        mesh.vert_ids()
            .map(|v| {
                let i = v.index();
                if geom.vert.is_border[i] {
                    mesh.position(v).coords - Vector3::new(rest[0][i], rest[1][i], rest[2][i])
                } else {
                    Vector3::zeros()
                }
            })
            .collect()
    }
}

impl Effector for BorderElasticity {
    fn label(&self) -> &'static str {
        "border_elasticity"
    }

    fn element(&self) -> Element {
        Element::Vert
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[
            (Attr::BorderElasticity, 1.0),
            (Attr::RestX, 0.0),
            (Attr::RestY, 0.0),
            (Attr::RestZ, 0.0),
        ]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        let k = mesh.attr(Element::Vert, Attr::BorderElasticity);
        Self::offsets(mesh, geom)
            .iter()
            .zip(k)
            .map(|(d, k)| k * d.norm_squared())
            .collect()
    }

    fn gradient(&self, mesh: &Mesh, geom: &Geometry) -> Gradient {
        let k = mesh.attr(Element::Vert, Attr::BorderElasticity);
        Gradient::Vertex(
            Self::offsets(mesh, geom)
                .into_iter()
                .zip(k)
                .map(|(d, k)| 2.0 * k * d)
                .collect(),
        )
    }
}

/// Apico-basal pull on every vertex, proportional to its height.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialTension;

impl Effector for RadialTension {
    fn label(&self) -> &'static str {
        "radial_tension"
    }

    fn element(&self) -> Element {
        Element::Vert
    }

    fn attributes(&self) -> &'static [(Attr, f64)] {
        &[(Attr::RadialTension, 1.0)]
    }

    fn energy(&self, mesh: &Mesh, geom: &Geometry) -> Vec<f64> {
        let tau = mesh.attr(Element::Vert, Attr::RadialTension);
        tau.iter().zip(&geom.vert.height).map(|(t, h)| t * h).collect()
    }

    fn gradient(&self, mesh: &Mesh, _geom: &Geometry) -> Gradient {
        let tau = mesh.attr(Element::Vert, Attr::RadialTension);
        Gradient::Vertex(tau.iter().map(|&t| t * Vector3::z()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::testing::{check_gradient, randomize};
    use crate::geometry::update_all;
    use crate::mesh::{build_sheet, extrude, generation, to_face_vertex, Segment};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sheet_effectors() -> Vec<Box<dyn Effector>> {
        vec![
            Box::new(LineTension),
            Box::new(LengthElasticity),
            Box::new(FaceAreaElasticity),
            Box::new(FaceVolumeElasticity),
            Box::new(FaceContractility),
            Box::new(SurfaceTension),
            Box::new(BorderElasticity),
            Box::new(RadialTension),
        ]
    }

    #[test]
    fn test_sheet_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(7);
        for effector in sheet_effectors() {
            let mut sheet = generation::three_faces_sheet().unwrap();
            randomize(&mut sheet, effector.as_ref(), &mut rng);
            check_gradient(&sheet, effector.as_ref(), &mut rng);
        }
    }

    #[test]
    fn test_planar_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        for effector in [
            Box::new(FaceAreaElasticity) as Box<dyn Effector>,
            Box::new(SurfaceTension),
            Box::new(LineTension),
        ] {
            let (positions, faces) = to_face_vertex(&generation::hexagonal_sheet(2, 2).unwrap());
            let mut mesh = build_sheet(MeshKind::Planar, &positions, &faces).unwrap();
            randomize(&mut mesh, effector.as_ref(), &mut rng);
            check_gradient(&mesh, effector.as_ref(), &mut rng);
        }
    }

    #[test]
    fn test_bulk_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let bulk: Vec<Box<dyn Effector>> = vec![
            Box::new(CellAreaElasticity),
            Box::new(CellVolumeElasticity),
            Box::new(LineTension),
            Box::new(FaceContractility),
        ];
        for effector in bulk {
            let sheet = generation::three_faces_sheet().unwrap();
            let mut mono = extrude(&sheet, 1.5).unwrap();
            randomize(&mut mono, effector.as_ref(), &mut rng);
            check_gradient(&mono, effector.as_ref(), &mut rng);
        }
    }

    #[test]
    fn test_cell_terms_vanish_without_cells() {
        let mut sheet = generation::three_faces_sheet().unwrap();
        update_all(&mut sheet);
        let geom = sheet.geometry().unwrap();
        for effector in [
            Box::new(CellAreaElasticity) as Box<dyn Effector>,
            Box::new(CellVolumeElasticity),
        ] {
            let energy = effector.energy(&sheet, geom);
            assert!(energy.is_empty());
            assert_eq!(energy.iter().sum::<f64>(), 0.0);
            let grad = effector.gradient(&sheet, geom).per_vertex(&sheet);
            assert_eq!(grad.len(), sheet.nv());
            assert!(grad.iter().all(|g| *g == Vector3::zeros()));
        }
    }

    #[test]
    fn test_radial_tension_pulls_along_z() {
        let mut mono = extrude(&generation::three_faces_sheet().unwrap(), 1.0).unwrap();
        mono.attr_mut(Element::Vert, Attr::RadialTension).fill(2.0);
        update_all(&mut mono);
        let geom = mono.geometry().unwrap();
        let energy = RadialTension.energy(&mono, geom);
        for v in mono.vert_ids() {
            let expected = if mono.vert_segment(v) == Segment::Basal { -2.0 } else { 0.0 };
            assert_relative_eq!(energy[v.index()], expected);
        }
    }

    #[test]
    fn test_unit_cube_volume_gradient_is_outward() {
        let mut cube = generation::unit_cube().unwrap();
        update_all(&mut cube);
        let geom = cube.geometry().unwrap();
        let (srce, trgt) = cell_volume_gradient(&cube, geom);
        let grad = Gradient::Edge { srce, trgt }.per_vertex(&cube);
        // dV/dr at a corner points away from the cube centre
        let center = Vector3::new(0.5, 0.5, 0.5);
        for v in cube.vert_ids() {
            let out = cube.position(v).coords - center;
            assert!(grad[v.index()].dot(&out) > 0.0);
        }
    }

    #[test]
    fn test_default_specs() {
        let spec = FaceAreaElasticity.specs();
        assert_eq!(spec.get(Element::Face, "area_elasticity"), Some(1.0));
        assert_eq!(spec.get(Element::Face, "prefered_area"), Some(1.0));
        assert!(spec.edge.is_empty());
    }
}
