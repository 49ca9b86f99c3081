//! Aggregation of effectors into one energy functional.

use std::collections::HashSet;

use nalgebra::Vector3;
use rayon::prelude::*;

use super::effectors::{Effector, Gradient};
use super::specs::{self, ParamSpec};
use crate::error::{MeshError, Result};
use crate::geometry::Geometry;
use crate::mesh::{Element, Mesh};

/// Energy of one effector, per governed element.
#[derive(Debug, Clone)]
pub struct EnergyTerm {
    /// Effector label.
    pub label: &'static str,
    /// Governed element kind.
    pub element: Element,
    /// One value per element, normalised by `nrj_norm_factor`.
    pub values: Vec<f64>,
}

/// Per-effector energies, in model order.
#[derive(Debug, Clone, Default)]
pub struct EnergyBreakdown {
    terms: Vec<EnergyTerm>,
}

impl EnergyBreakdown {
    /// Per-element energies of `label`; empty when the model has no such term.
    pub fn get(&self, label: &str) -> &[f64] {
        self.terms
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.values.as_slice())
            .unwrap_or(&[])
    }

    /// Summed energy of `label`.
    pub fn sum(&self, label: &str) -> f64 {
        self.get(label).iter().sum()
    }

    /// Grand total.
    pub fn total(&self) -> f64 {
        self.terms.iter().flat_map(|t| t.values.iter()).sum()
    }

    /// Iterate over the terms.
    pub fn iter(&self) -> impl Iterator<Item = &EnergyTerm> {
        self.terms.iter()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the model had no effector.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Gradient of one effector.
#[derive(Debug, Clone)]
pub struct GradientTerm {
    /// Effector label.
    pub label: &'static str,
    /// Source/target decomposition as returned by the effector.
    pub gradient: Gradient,
    /// Accumulated per-vertex gradient.
    pub per_vertex: Vec<Vector3<f64>>,
}

/// Per-effector gradients, in model order.
#[derive(Debug, Clone, Default)]
pub struct GradientBreakdown {
    nv: usize,
    terms: Vec<GradientTerm>,
}

impl GradientBreakdown {
    /// The term of `label`, if the model has it.
    pub fn get(&self, label: &str) -> Option<&GradientTerm> {
        self.terms.iter().find(|t| t.label == label)
    }

    /// Per-vertex gradient of `label`; zeros when the model has no such term.
    pub fn per_vertex(&self, label: &str) -> Vec<Vector3<f64>> {
        self.get(label)
            .map_or_else(|| vec![Vector3::zeros(); self.nv], |t| t.per_vertex.clone())
    }

    /// Sum of every term.
    pub fn total(&self) -> Vec<Vector3<f64>> {
        let mut out = vec![Vector3::zeros(); self.nv];
        for term in &self.terms {
            for (o, g) in out.iter_mut().zip(&term.per_vertex) {
                *o += g;
            }
        }
        out
    }

    /// Iterate over the terms.
    pub fn iter(&self) -> impl Iterator<Item = &GradientTerm> {
        self.terms.iter()
    }
}

/// An ordered set of effectors with distinct labels.
///
/// # Example
///
/// ```
/// use epithelium::dynamics::{FaceAreaElasticity, LineTension, Model};
/// use epithelium::geometry;
/// use epithelium::mesh::generation;
///
/// let model = Model::new(vec![Box::new(LineTension), Box::new(FaceAreaElasticity)]);
/// let mut sheet = generation::three_faces_sheet().unwrap();
/// sheet.update_specs(model.specs()).unwrap();
/// geometry::update_all(&mut sheet);
///
/// let energy = model.compute_energy(&sheet).unwrap();
/// let grad = model.compute_gradient(&sheet).unwrap();
/// assert!(energy > 0.0);
/// assert_eq!(grad.len(), sheet.nv());
/// ```
#[derive(Debug)]
pub struct Model {
    effectors: Vec<Box<dyn Effector>>,
    specs: ParamSpec,
    parallel: bool,
}

impl Model {
    /// Create a model whose specs are the merged defaults of its effectors.
    pub fn new(effectors: Vec<Box<dyn Effector>>) -> Self {
        let effectors = dedup(effectors);
        let mut spec = ParamSpec::default();
        for effector in &effectors {
            spec.merge(&effector.specs());
        }
        log::debug!(
            "model with {} effectors: {:?}",
            effectors.len(),
            effectors.iter().map(|e| e.label()).collect::<Vec<_>>()
        );
        Self {
            effectors,
            specs: spec,
            parallel: true,
        }
    }

    /// Create a model with caller-provided specs.
    ///
    /// Fails if an effector governs an element kind the spec has no section
    /// for, or reads an attribute the spec does not define.
    pub fn with_specs(effectors: Vec<Box<dyn Effector>>, spec: &ParamSpec) -> Result<Self> {
        let effectors = dedup(effectors);
        for effector in &effectors {
            let element = effector.element();
            if spec.section(element).is_empty() {
                return Err(MeshError::EmptyElement {
                    owner: effector.label(),
                    element,
                });
            }
            for &(attr, _) in effector.attributes() {
                spec.require(effector.label(), element, attr.name())?;
            }
        }
        Ok(Self {
            effectors,
            specs: spec.clone(),
            parallel: true,
        })
    }

    /// Set whether effectors are evaluated in parallel (default: true).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The effectors, in evaluation order.
    pub fn effectors(&self) -> &[Box<dyn Effector>] {
        &self.effectors
    }

    /// Effector labels, in evaluation order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.effectors.iter().map(|e| e.label()).collect()
    }

    /// Parameter spec of the model.
    pub fn specs(&self) -> &ParamSpec {
        &self.specs
    }

    /// Convert a dimensionless spec to physical units. See
    /// [`dimensionalize`](specs::dimensionalize).
    pub fn dimensionalize(nondim: &ParamSpec) -> Result<ParamSpec> {
        specs::dimensionalize(nondim)
    }

    fn evaluate<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&dyn Effector) -> T + Sync,
    {
        if self.parallel {
            self.effectors.par_iter().map(|e| f(e.as_ref())).collect()
        } else {
            self.effectors.iter().map(|e| f(e.as_ref())).collect()
        }
    }

    // ==================== Energy ====================

    /// Total energy, divided by `settings.nrj_norm_factor`.
    pub fn compute_energy(&self, mesh: &Mesh) -> Result<f64> {
        Ok(self.compute_energy_terms(mesh)?.total())
    }

    /// Energy of every effector, per governed element.
    pub fn compute_energy_terms(&self, mesh: &Mesh) -> Result<EnergyBreakdown> {
        let geom = mesh.geometry()?;
        let norm = mesh.settings().nrj_norm_factor;
        let terms = self.evaluate(|effector| EnergyTerm {
            label: effector.label(),
            element: effector.element(),
            values: effector
                .energy(mesh, geom)
                .into_iter()
                .map(|e| e / norm)
                .collect(),
        });
        Ok(EnergyBreakdown { terms })
    }

    // ==================== Gradient ====================

    /// Per-vertex gradient of the total energy, divided by
    /// `settings.nrj_norm_factor`.
    pub fn compute_gradient(&self, mesh: &Mesh) -> Result<Vec<Vector3<f64>>> {
        Ok(self.compute_gradient_terms(mesh)?.total())
    }

    /// Gradient of every effector, keeping its source/target decomposition.
    pub fn compute_gradient_terms(&self, mesh: &Mesh) -> Result<GradientBreakdown> {
        let geom = mesh.geometry()?;
        let terms = self.evaluate(|effector| gradient_term(effector, mesh, geom));
        Ok(GradientBreakdown {
            nv: mesh.nv(),
            terms,
        })
    }
}

fn gradient_term(effector: &dyn Effector, mesh: &Mesh, geom: &Geometry) -> GradientTerm {
    let mut gradient = effector.gradient(mesh, geom);
    gradient.scale(1.0 / mesh.settings().nrj_norm_factor);
    let per_vertex = gradient.per_vertex(mesh);
    GradientTerm {
        label: effector.label(),
        gradient,
        per_vertex,
    }
}

/// Keep the first effector of every label.
fn dedup(effectors: Vec<Box<dyn Effector>>) -> Vec<Box<dyn Effector>> {
    let mut seen = HashSet::new();
    effectors
        .into_iter()
        .filter(|e| {
            let fresh = seen.insert(e.label());
            if !fresh {
                log::debug!("dropping duplicate effector `{}`", e.label());
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::effectors::*;
    use crate::dynamics::specs::Settings;
    use crate::geometry::update_all;
    use crate::mesh::{extrude, generation, Attr};
    use approx::assert_relative_eq;

    fn fan_spec() -> ParamSpec {
        ParamSpec::default()
            .with(Element::Edge, "line_tension", 0.04)
            .with(Element::Face, "area_elasticity", 1.0)
            .with(Element::Face, "prefered_area", 24.0)
            .with(Element::Face, "vol_elasticity", 1.0)
    }

    #[test]
    fn test_hexagonal_fan_at_rest_area() {
        // equilateral triangles of area 24
        let side = (4.0 * 24.0 / 3f64.sqrt()).sqrt();
        let mut fan = generation::hexagon_fan(side).unwrap();
        let spec = fan_spec();
        fan.update_specs(&spec).unwrap();
        update_all(&mut fan);

        let model =
            Model::with_specs(vec![Box::new(LineTension), Box::new(FaceAreaElasticity)], &spec).unwrap();
        let geom = fan.geometry().unwrap();
        for &a in &geom.face.area {
            assert_relative_eq!(a, 24.0, max_relative = 1e-12);
        }

        let terms = model.compute_energy_terms(&fan).unwrap();
        assert!(terms.sum("face_area_elasticity") < 1e-20);
        let total_length: f64 = geom.edge.length.iter().sum();
        assert_relative_eq!(total_length, 18.0 * side, max_relative = 1e-12);
        assert_relative_eq!(
            model.compute_energy(&fan).unwrap(),
            0.04 * total_length,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_cell_effectors_on_sheet_are_zero() {
        let model = Model::new(vec![Box::new(CellAreaElasticity), Box::new(CellVolumeElasticity)]);
        let mut sheet = generation::three_faces_sheet().unwrap();
        update_all(&mut sheet);
        assert_eq!(model.compute_energy(&sheet).unwrap(), 0.0);
        let terms = model.compute_energy_terms(&sheet).unwrap();
        assert_eq!(terms.len(), 2);
        assert!(terms.get("cell_volume_elasticity").is_empty());
        let grad = model.compute_gradient(&sheet).unwrap();
        assert!(grad.iter().all(|g| *g == Vector3::zeros()));
    }

    #[test]
    fn test_duplicate_labels_are_dropped() {
        let model = Model::new(vec![
            Box::new(LineTension),
            Box::new(SurfaceTension),
            Box::new(LineTension),
        ]);
        assert_eq!(model.labels(), vec!["line_tension", "surface_tension"]);
    }

    #[test]
    fn test_with_specs_reports_configuration_errors() {
        let spec = ParamSpec::default().with(Element::Edge, "line_tension", 0.1);
        let err = Model::with_specs(vec![Box::new(FaceContractility)], &spec).unwrap_err();
        assert!(matches!(
            err,
            MeshError::EmptyElement {
                owner: "face_contractility",
                element: Element::Face
            }
        ));

        let spec = spec.with(Element::Edge, "length_elasticity", 1.0);
        let err = Model::with_specs(vec![Box::new(LengthElasticity)], &spec).unwrap_err();
        match err {
            MeshError::MissingAttribute { owner, name, .. } => {
                assert_eq!(owner, "length_elasticity");
                assert_eq!(name, "prefered_length");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_breakdowns_of_absent_effectors() {
        let model = Model::new(vec![Box::new(LineTension)]);
        let mut sheet = generation::three_faces_sheet().unwrap();
        sheet.update_specs(model.specs()).unwrap();
        update_all(&mut sheet);
        let energy = model.compute_energy_terms(&sheet).unwrap();
        assert!(energy.get("surface_tension").is_empty());
        assert_eq!(energy.get("line_tension").len(), sheet.ne());

        let grad = model.compute_gradient_terms(&sheet).unwrap();
        assert!(grad.get("surface_tension").is_none());
        let zeros = grad.per_vertex("surface_tension");
        assert_eq!(zeros.len(), sheet.nv());
        assert!(zeros.iter().all(|g| *g == Vector3::zeros()));
        assert!(matches!(
            grad.get("line_tension").map(|t| &t.gradient),
            Some(Gradient::Edge { .. })
        ));
    }

    #[test]
    fn test_stale_geometry_is_refused() {
        let model = Model::new(vec![Box::new(LineTension)]);
        let mut sheet = generation::three_faces_sheet().unwrap();
        assert!(matches!(model.compute_energy(&sheet), Err(MeshError::StaleGeometry)));
        update_all(&mut sheet);
        sheet.displace(&vec![Vector3::new(0.1, 0.0, 0.0); sheet.nv()]).unwrap();
        assert!(matches!(model.compute_gradient(&sheet), Err(MeshError::StaleGeometry)));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let effectors = || -> Vec<Box<dyn Effector>> {
            vec![
                Box::new(LineTension),
                Box::new(FaceContractility),
                Box::new(CellVolumeElasticity),
                Box::new(CellAreaElasticity),
            ]
        };
        let par = Model::new(effectors());
        let seq = Model::new(effectors()).with_parallel(false);
        let mut mono = extrude(&generation::three_faces_sheet().unwrap(), 2.0).unwrap();
        mono.update_specs(par.specs()).unwrap();
        update_all(&mut mono);

        assert_eq!(par.compute_energy(&mono).unwrap(), seq.compute_energy(&mono).unwrap());
        assert_eq!(par.compute_gradient(&mono).unwrap(), seq.compute_gradient(&mono).unwrap());
    }

    #[test]
    fn test_energy_normalisation() {
        let model = Model::new(vec![Box::new(SurfaceTension)]);
        let mut sheet = generation::three_faces_sheet().unwrap();
        sheet.update_specs(model.specs()).unwrap();
        update_all(&mut sheet);
        let raw = model.compute_energy(&sheet).unwrap();
        let raw_grad = model.compute_gradient(&sheet).unwrap();

        let settings = Settings {
            nrj_norm_factor: 4.0,
            ..sheet.settings().clone()
        };
        sheet.set_settings(settings);
        update_all(&mut sheet);
        assert_relative_eq!(model.compute_energy(&sheet).unwrap(), raw / 4.0);
        let grad = model.compute_gradient(&sheet).unwrap();
        assert_relative_eq!(grad[0], raw_grad[0] / 4.0);
    }

    #[test]
    fn test_model_gradient_matches_sum_of_terms() {
        let model = Model::new(vec![Box::new(LineTension), Box::new(FaceAreaElasticity)]);
        let mut sheet = generation::hexagonal_sheet(3, 2).unwrap();
        sheet.update_specs(model.specs()).unwrap();
        sheet.attr_mut(Element::Face, Attr::PreferedArea).fill(2.0);
        update_all(&mut sheet);
        let terms = model.compute_gradient_terms(&sheet).unwrap();
        let total = model.compute_gradient(&sheet).unwrap();
        let lt = terms.per_vertex("line_tension");
        let ae = terms.per_vertex("face_area_elasticity");
        for v in 0..sheet.nv() {
            assert_relative_eq!(total[v], lt[v] + ae[v], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_model_dimensionalize() {
        let nondim = ParamSpec::default()
            .with(Element::Face, "vol_elasticity", 1.0)
            .with(Element::Face, "prefered_area", 24.0)
            .with(Element::Face, "prefered_height", 10.0)
            .with(Element::Edge, "line_tension", 0.04);
        let dim = Model::dimensionalize(&nondim).unwrap();
        assert_relative_eq!(
            dim.get(Element::Edge, "line_tension").unwrap(),
            0.04 * 240f64.powf(5.0 / 3.0),
            max_relative = 1e-12
        );
    }
}
