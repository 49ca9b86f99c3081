//! Cell behaviors.
//!
//! Behaviors mutate target attributes (contractility, preferred volume, line
//! tension) and may fire topology transitions. They are meant to be driven by
//! an external scheduler that owns a queue of pending invocations: a behavior
//! returning [`Step::Continue`] asks to be called again at the next time step,
//! [`Step::Done`] retires it.
//!
//! Behaviors read areas and volumes from the mesh geometry and refresh it when
//! it is stale.
//!
//! # Example
//!
//! ```
//! use epithelium::behaviors::{apoptosis, ApoptosisSettings, Step};
//! use epithelium::mesh::{generation, CellId};
//!
//! let mut mono = generation::monolayer(3, 3, 1.0).unwrap();
//! let settings = ApoptosisSettings::default();
//!
//! // The apical face is still large: the first step only contracts it.
//! let step = apoptosis(&mut mono, CellId::new(4), &settings).unwrap();
//! assert_eq!(step, Step::Continue);
//! assert_eq!(mono.nf(), 72);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::geometry::{update_all, Geometry};
use crate::mesh::{Attr, CellId, Element, FaceId, Mesh, Segment};
use crate::topology::{hi_transition, ih_transition};

/// Outcome of one behavior invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Call the behavior again at the next step.
    Continue,
    /// The behavior is finished.
    Done,
}

fn fresh_geometry(mesh: &mut Mesh) -> Result<&Geometry> {
    if !mesh.is_geometry_fresh() {
        update_all(mesh);
    }
    mesh.geometry()
}

/// The face of `cell` labelled apical.
pub fn apical_face(mesh: &Mesh, cell: CellId) -> Result<FaceId> {
    mesh.check_cell(cell)?;
    mesh.cell_faces(cell)
        .iter()
        .copied()
        .find(|&f| mesh.face_segment(f) == Segment::Apical)
        .ok_or(MeshError::ApicalFaceNotFound { cell })
}

// ==================== Attribute mutations ====================

/// Raise the contractility of a face, by `increase` or, when `multiple` is
/// set, by a factor `increase`.
pub fn contract(mesh: &mut Mesh, face: FaceId, increase: f64, multiple: bool) -> Result<()> {
    mesh.check_face(face)?;
    let value = &mut mesh.attr_mut(Element::Face, Attr::Contractility)[face.index()];
    if multiple {
        *value *= increase;
    } else {
        *value += increase;
    }
    Ok(())
}

/// Divide the preferred volume of a cell by `1 + rate` and its preferred
/// area by `(1 + rate)^(2/3)`.
pub fn shrink(mesh: &mut Mesh, cell: CellId, rate: f64) -> Result<()> {
    mesh.check_cell(cell)?;
    let factor = 1.0 + rate;
    mesh.attr_mut(Element::Cell, Attr::PreferedVol)[cell.index()] /= factor;
    mesh.attr_mut(Element::Cell, Attr::PreferedArea)[cell.index()] /= factor.powf(2.0 / 3.0);
    Ok(())
}

/// Multiply the preferred volume of a cell by `1 + rate` and the preferred
/// area of each of its faces by `(1 + rate)^(2/3)`.
pub fn grow(mesh: &mut Mesh, cell: CellId, rate: f64) -> Result<()> {
    mesh.check_cell(cell)?;
    let factor = 1.0 + rate;
    mesh.attr_mut(Element::Cell, Attr::PreferedVol)[cell.index()] *= factor;
    let faces = mesh.cell_faces(cell).to_vec();
    let area = mesh.attr_mut(Element::Face, Attr::PreferedArea);
    for f in faces {
        area[f.index()] *= factor.powf(2.0 / 3.0);
    }
    Ok(())
}

/// Add `factor` times the default line tension to the lateral half-edges of
/// a cell that run between its apical and basal surfaces.
///
/// The default is the `edge.line_tension` entry of the installed specs.
pub fn ab_pull(mesh: &mut Mesh, cell: CellId, factor: f64) -> Result<()> {
    mesh.check_cell(cell)?;
    let base = mesh.specs().require("ab_pull", Element::Edge, Attr::LineTension.name())?;
    let pulled: Vec<usize> = mesh
        .cell_edges(cell)
        .into_iter()
        .filter(|&e| mesh.edge_segment(e) == Segment::Lateral)
        .filter(|&e| {
            matches!(
                (mesh.vert_segment(mesh.srce(e)), mesh.vert_segment(mesh.trgt(e))),
                (Segment::Apical, Segment::Basal) | (Segment::Basal, Segment::Apical)
            )
        })
        .map(|e| e.index())
        .collect();
    let tension = mesh.attr_mut(Element::Edge, Attr::LineTension);
    for e in pulled {
        tension[e] += base * factor;
    }
    Ok(())
}

// ==================== Contraction ====================

/// Settings of [`contract_apical_face`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractionSettings {
    /// Added to the contractility at each call.
    pub contractile_increase: f64,
    /// Faces smaller than this are left alone.
    pub critical_area: f64,
    /// Faces more contractile than this are left alone.
    pub max_contractility: f64,
}

impl Default for ContractionSettings {
    fn default() -> Self {
        Self {
            contractile_increase: 1.0,
            critical_area: 1e-2,
            max_contractility: 50.0,
        }
    }
}

impl ContractionSettings {
    /// Set the contractility increment.
    pub fn with_increase(mut self, increase: f64) -> Self {
        self.contractile_increase = increase;
        self
    }

    /// Set the area below which the face is no longer contracted.
    pub fn with_critical_area(mut self, area: f64) -> Self {
        self.critical_area = area;
        self
    }

    /// Set the contractility above which the face is no longer contracted.
    pub fn with_max_contractility(mut self, value: f64) -> Self {
        self.max_contractility = value;
        self
    }
}

/// Increase the contractility of an apical face by a fixed amount.
///
/// Nothing happens when the face is not apical, its area is below
/// `critical_area` or its contractility already exceeds `max_contractility`.
/// This is a one-shot behavior: it always returns [`Step::Done`].
pub fn contract_apical_face(
    mesh: &mut Mesh,
    face: FaceId,
    settings: &ContractionSettings,
) -> Result<Step> {
    mesh.check_face(face)?;
    if mesh.face_segment(face) != Segment::Apical {
        return Ok(Step::Done);
    }
    let area = fresh_geometry(mesh)?.face.area[face.index()];
    let contractility = mesh.attr(Element::Face, Attr::Contractility)[face.index()];
    if area < settings.critical_area || contractility > settings.max_contractility {
        return Ok(Step::Done);
    }
    contract(mesh, face, settings.contractile_increase, false)?;
    Ok(Step::Done)
}

// ==================== Apoptosis ====================

/// Settings of [`apoptosis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApoptosisSettings {
    /// Factor applied to the apical contractility at each contraction step.
    pub contract_rate: f64,
    /// Apical area below which contraction gives way to rearrangements.
    pub critical_area: f64,
    /// Rate passed to [`shrink`] once the cell is a tetrahedron.
    pub shrink_rate: f64,
    /// Volume below which the cell is considered gone.
    pub critical_volume: f64,
    /// Lower bound on the length of the edges IH replaces.
    pub threshold_length: f64,
}

impl Default for ApoptosisSettings {
    fn default() -> Self {
        Self {
            contract_rate: 2.0,
            critical_area: 1e-2,
            shrink_rate: 0.4,
            critical_volume: 0.1,
            threshold_length: 1e-3,
        }
    }
}

impl ApoptosisSettings {
    /// Set the contraction factor.
    pub fn with_contract_rate(mut self, rate: f64) -> Self {
        self.contract_rate = rate;
        self
    }

    /// Set the critical apical area.
    pub fn with_critical_area(mut self, area: f64) -> Self {
        self.critical_area = area;
        self
    }

    /// Set the shrink rate.
    pub fn with_shrink_rate(mut self, rate: f64) -> Self {
        self.shrink_rate = rate;
        self
    }

    /// Set the critical volume.
    pub fn with_critical_volume(mut self, volume: f64) -> Self {
        self.critical_volume = volume;
        self
    }

    /// Set the IH length bound.
    pub fn with_threshold_length(mut self, length: f64) -> Self {
        self.threshold_length = length;
        self
    }
}

/// One step of the apoptotic extrusion of a cell.
///
/// 1. While the apical face is larger than `critical_area`, its
///    contractility is multiplied by `contract_rate`
/// 2. Then the apical face loses its shortest edge to an IH transition until
///    it is a triangle, which an HI transition removes. Faces created by IH
///    start with zero contractility.
/// 3. Without an apical face, triangular lateral faces are removed by HI
///    until the cell has four faces
/// 4. The remaining tetrahedron shrinks until its volume is at most
///    `critical_volume`, which ends the behavior
///
/// The shortest apical edge is split whatever its length: the threshold is
/// raised to that length for the call and restored afterwards.
pub fn apoptosis(mesh: &mut Mesh, cell: CellId, settings: &ApoptosisSettings) -> Result<Step> {
    mesh.check_cell(cell)?;

    match apical_face(mesh, cell) {
        Ok(face) => {
            let area = fresh_geometry(mesh)?.face.area[face.index()];
            if area > settings.critical_area {
                contract(mesh, face, settings.contract_rate, true)?;
                return Ok(Step::Continue);
            }

            if mesh.num_sides(face) > 3 {
                let lengths = &mesh.geometry()?.edge.length;
                let Some(edge) = mesh
                    .face_edges(face)
                    .iter()
                    .copied()
                    .min_by(|a, b| lengths[a.index()].total_cmp(&lengths[b.index()]))
                else {
                    return Ok(Step::Done);
                };

                let saved = mesh.settings().threshold_length;
                mesh.set_threshold_length(settings.threshold_length.max(mesh.edge_length(edge)));
                let report = ih_transition(mesh, edge);
                mesh.set_threshold_length(saved);
                let report = report?;

                let contractility = mesh.attr_mut(Element::Face, Attr::Contractility);
                for f in &report.faces {
                    contractility[f.index()] = 0.0;
                }
                log::debug!("apoptosis of {:?}: split apical edge {:?}", cell, edge);
            } else {
                hi_transition(mesh, face)?;
                log::debug!("apoptosis of {:?}: apical face removed", cell);
            }
            Ok(Step::Continue)
        }
        Err(MeshError::ApicalFaceNotFound { .. }) => {
            let faces = mesh.cell_faces(cell).to_vec();
            if faces.len() > 4 {
                let triangle = faces
                    .iter()
                    .copied()
                    .find(|&f| mesh.face_segment(f) == Segment::Lateral && mesh.num_sides(f) == 3)
                    .ok_or(MeshError::NoLateralTriangle { cell })?;
                hi_transition(mesh, triangle)?;
                log::debug!("apoptosis of {:?}: lateral face removed", cell);
                return Ok(Step::Continue);
            }

            let vol = fresh_geometry(mesh)?.cell.vol[cell.index()];
            if vol > settings.critical_volume {
                shrink(mesh, cell, settings.shrink_rate)?;
                Ok(Step::Continue)
            } else {
                log::debug!("apoptosis of {:?}: done", cell);
                Ok(Step::Done)
            }
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::ParamSpec;
    use crate::mesh::generation;
    use approx::assert_relative_eq;

    fn middle() -> CellId {
        CellId::new(4)
    }

    fn honeycomb() -> Mesh {
        generation::monolayer(3, 3, 1.0).unwrap()
    }

    /// Skip the contraction and shrinking stages, which need a solver to
    /// move vertices.
    fn topological() -> ApoptosisSettings {
        ApoptosisSettings::default()
            .with_critical_area(10.0)
            .with_critical_volume(10.0)
    }

    #[test]
    fn test_contract_apical_face_adds_increment() {
        let mut mesh = honeycomb();
        let face = apical_face(&mesh, middle()).unwrap();
        mesh.attr_mut(Element::Face, Attr::Contractility)[face.index()] = 1.5;

        let settings = ContractionSettings::default().with_increase(0.25);
        assert_eq!(contract_apical_face(&mut mesh, face, &settings).unwrap(), Step::Done);
        assert_eq!(mesh.attr(Element::Face, Attr::Contractility)[face.index()], 1.75);
    }

    #[test]
    fn test_contract_apical_face_below_critical_area() {
        let mut mesh = honeycomb();
        let face = apical_face(&mesh, middle()).unwrap();
        mesh.attr_mut(Element::Face, Attr::Contractility)[face.index()] = 1.5;

        // a unit hexagon is about 2.6 in area
        let settings = ContractionSettings::default().with_critical_area(3.0);
        contract_apical_face(&mut mesh, face, &settings).unwrap();
        assert_eq!(mesh.attr(Element::Face, Attr::Contractility)[face.index()], 1.5);
    }

    #[test]
    fn test_contract_apical_face_ignores_other_faces() {
        let mut mesh = honeycomb();
        let lateral = mesh
            .cell_faces(middle())
            .iter()
            .copied()
            .find(|&f| mesh.face_segment(f) == Segment::Lateral)
            .unwrap();
        contract_apical_face(&mut mesh, lateral, &ContractionSettings::default()).unwrap();
        assert_eq!(mesh.attr(Element::Face, Attr::Contractility)[lateral.index()], 0.0);

        let apical = apical_face(&mesh, middle()).unwrap();
        mesh.attr_mut(Element::Face, Attr::Contractility)[apical.index()] = 60.0;
        contract_apical_face(&mut mesh, apical, &ContractionSettings::default()).unwrap();
        assert_eq!(mesh.attr(Element::Face, Attr::Contractility)[apical.index()], 60.0);
    }

    #[test]
    fn test_shrink_and_grow() {
        let mut mesh = honeycomb();
        shrink(&mut mesh, middle(), 0.4).unwrap();
        assert_relative_eq!(mesh.attr(Element::Cell, Attr::PreferedVol)[4], 1.0 / 1.4);
        assert_relative_eq!(
            mesh.attr(Element::Cell, Attr::PreferedArea)[4],
            1.4f64.powf(-2.0 / 3.0)
        );

        grow(&mut mesh, middle(), 0.4).unwrap();
        assert_relative_eq!(mesh.attr(Element::Cell, Attr::PreferedVol)[4], 1.0, epsilon = 1e-12);
        let face = apical_face(&mesh, middle()).unwrap();
        assert_relative_eq!(
            mesh.attr(Element::Face, Attr::PreferedArea)[face.index()],
            1.4f64.powf(2.0 / 3.0)
        );
        assert!(shrink(&mut mesh, CellId::new(99), 0.4).is_err());
    }

    #[test]
    fn test_ab_pull() {
        let mut mesh = honeycomb();
        let spec = ParamSpec::default().with(Element::Edge, "line_tension", 0.5);
        mesh.update_specs(&spec).unwrap();
        ab_pull(&mut mesh, middle(), 2.0).unwrap();

        let tension = mesh.attr(Element::Edge, Attr::LineTension);
        let pulled: Vec<_> = mesh
            .cell_edges(middle())
            .into_iter()
            .filter(|&e| tension[e.index()] > 0.5)
            .collect();
        // two half-edges along each of the six vertical junctions
        assert_eq!(pulled.len(), 12);
        for e in pulled {
            assert_relative_eq!(tension[e.index()], 1.5);
            assert_eq!(mesh.edge_segment(e), Segment::Lateral);
        }
    }

    #[test]
    fn test_ab_pull_needs_default_tension() {
        let mut mesh = honeycomb();
        let err = ab_pull(&mut mesh, middle(), 2.0).unwrap_err();
        assert!(matches!(err, MeshError::MissingAttribute { .. }));
    }

    #[test]
    fn test_apical_face_lookup() {
        let mesh = honeycomb();
        let face = apical_face(&mesh, middle()).unwrap();
        assert_eq!(mesh.face_segment(face), Segment::Apical);

        let cube = generation::unit_cube().unwrap();
        assert!(matches!(
            apical_face(&cube, CellId::new(0)),
            Err(MeshError::ApicalFaceNotFound { .. })
        ));
    }

    #[test]
    fn test_apoptosis_contracts_first() {
        let mut mesh = honeycomb();
        let face = apical_face(&mesh, middle()).unwrap();
        mesh.attr_mut(Element::Face, Attr::Contractility)[face.index()] = 1.0;

        let step = apoptosis(&mut mesh, middle(), &ApoptosisSettings::default()).unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(mesh.attr(Element::Face, Attr::Contractility)[face.index()], 2.0);
        assert_eq!(mesh.nf(), 72);
    }

    #[test]
    fn test_apoptosis_runs_to_completion() {
        let mut mesh = honeycomb();
        let settings = topological();
        let nc = mesh.nc();

        let mut steps = 0;
        while apoptosis(&mut mesh, middle(), &settings).unwrap() == Step::Continue {
            assert!(mesh.is_valid());
            steps += 1;
            assert!(steps < 20, "apoptosis did not finish");
        }

        // three IH, the apical HI, three lateral HI
        assert_eq!(steps, 7);
        assert_eq!(mesh.nc(), nc);
        assert_eq!(mesh.cell_faces(middle()).len(), 4);
        assert!(apical_face(&mesh, middle()).is_err());
        for &f in mesh.cell_faces(middle()) {
            assert_eq!(mesh.num_sides(f), 3);
        }
        update_all(&mut mesh);
        assert!(mesh.geometry().unwrap().cell.vol[4] > 0.0);
    }

    #[test]
    fn test_apoptosis_new_faces_are_relaxed() {
        let mut mesh = honeycomb();
        mesh.attr_mut(Element::Face, Attr::Contractility).fill(1.0);
        let nf = mesh.nf();

        apoptosis(&mut mesh, middle(), &topological()).unwrap();
        assert_eq!(mesh.nf(), nf + 2);
        let contractility = mesh.attr(Element::Face, Attr::Contractility);
        assert!(contractility[nf..].iter().all(|&c| c == 0.0));
        assert!(contractility[..nf].iter().all(|&c| c == 1.0));
    }

    #[test]
    fn test_apoptosis_shrinks_tetrahedron() {
        let mut mesh = honeycomb();
        let settings = topological();
        while apoptosis(&mut mesh, middle(), &settings).unwrap() == Step::Continue {}

        let shrinking = settings.clone().with_critical_volume(1e-3);
        let step = apoptosis(&mut mesh, middle(), &shrinking).unwrap();
        assert_eq!(step, Step::Continue);
        assert_relative_eq!(mesh.attr(Element::Cell, Attr::PreferedVol)[4], 1.0 / 1.4);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: ApoptosisSettings =
            serde_json::from_str(r#"{"contract_rate": 3.0, "critical_volume": 0.5}"#).unwrap();
        assert_eq!(settings.contract_rate, 3.0);
        assert_eq!(settings.critical_volume, 0.5);
        assert_eq!(settings.shrink_rate, 0.4);
    }
}
