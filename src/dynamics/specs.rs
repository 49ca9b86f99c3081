//! Parameter specs, settings and unit scaling.
//!
//! A [`ParamSpec`] maps attribute names to values for each element kind, plus
//! a free-form `settings` section. It is the configuration surface of the
//! crate: models derive their defaults from it, meshes install it with
//! [`Mesh::update_specs`](crate::mesh::Mesh::update_specs), and it round-trips
//! through serde.
//!
//! ```
//! use epithelium::dynamics::{dimensionalize, ParamSpec};
//! use epithelium::mesh::Element;
//!
//! let nondim = ParamSpec::default()
//!     .with(Element::Face, "vol_elasticity", 1.0)
//!     .with(Element::Face, "prefered_area", 24.0)
//!     .with(Element::Face, "prefered_height", 10.0)
//!     .with(Element::Edge, "line_tension", 0.04);
//! let dim = dimensionalize(&nondim).unwrap();
//! assert_eq!(dim.get(Element::Face, "prefered_vol"), Some(240.0));
//! assert_eq!(nondim.get(Element::Face, "prefered_vol"), None);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::mesh::Element;

/// Per-element parameter values and global settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Vertex attributes.
    #[serde(default, alias = "vertex")]
    pub vert: BTreeMap<String, f64>,
    /// Half-edge attributes.
    #[serde(default)]
    pub edge: BTreeMap<String, f64>,
    /// Face attributes.
    #[serde(default)]
    pub face: BTreeMap<String, f64>,
    /// Cell attributes.
    #[serde(default)]
    pub cell: BTreeMap<String, f64>,
    /// Scalar settings (`threshold_length`, `basal_shift`, normalisation factors).
    #[serde(default)]
    pub settings: BTreeMap<String, f64>,
}

impl ParamSpec {
    /// The section of one element kind.
    pub fn section(&self, element: Element) -> &BTreeMap<String, f64> {
        match element {
            Element::Vert => &self.vert,
            Element::Edge => &self.edge,
            Element::Face => &self.face,
            Element::Cell => &self.cell,
        }
    }

    /// Mutable section of one element kind.
    pub fn section_mut(&mut self, element: Element) -> &mut BTreeMap<String, f64> {
        match element {
            Element::Vert => &mut self.vert,
            Element::Edge => &mut self.edge,
            Element::Face => &mut self.face,
            Element::Cell => &mut self.cell,
        }
    }

    /// Value of `name` for `element`.
    pub fn get(&self, element: Element, name: &str) -> Option<f64> {
        self.section(element).get(name).copied()
    }

    /// Set `name` for `element`.
    pub fn set(&mut self, element: Element, name: &str, value: f64) {
        self.section_mut(element).insert(name.to_owned(), value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, element: Element, name: &str, value: f64) -> Self {
        self.set(element, name, value);
        self
    }

    /// Builder form for the settings section.
    pub fn with_setting(mut self, name: &str, value: f64) -> Self {
        self.settings.insert(name.to_owned(), value);
        self
    }

    /// Value of `name` for `element`, or a configuration error naming `owner`.
    pub fn require(&self, owner: &'static str, element: Element, name: &str) -> Result<f64> {
        self.get(element, name).ok_or_else(|| MeshError::MissingAttribute {
            owner,
            element,
            name: name.to_owned(),
        })
    }

    /// Copy every value of `other` into `self`, overwriting shared keys.
    pub fn merge(&mut self, other: &ParamSpec) {
        for element in Element::ALL {
            let dst = self.section_mut(element);
            for (k, &v) in other.section(element) {
                dst.insert(k.clone(), v);
            }
        }
        for (k, &v) in &other.settings {
            self.settings.insert(k.clone(), v);
        }
    }
}

/// Typed view of the settings a mesh reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Edges at or below this length may undergo an IH transition.
    pub threshold_length: f64,
    /// Height reference: `height = z - basal_shift`.
    pub basal_shift: f64,
    /// Force scale used to make gradients dimensionless.
    pub grad_norm_factor: f64,
    /// Energy scale used to make energies dimensionless.
    pub nrj_norm_factor: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold_length: 1e-2,
            basal_shift: 0.0,
            grad_norm_factor: 1.0,
            nrj_norm_factor: 1.0,
        }
    }
}

impl Settings {
    /// Apply the known keys of a settings section.
    pub fn update(&mut self, values: &BTreeMap<String, f64>) {
        for (key, &value) in values {
            match key.as_str() {
                "threshold_length" => self.threshold_length = value,
                "basal_shift" => self.basal_shift = value,
                "grad_norm_factor" => self.grad_norm_factor = value,
                "nrj_norm_factor" => self.nrj_norm_factor = value,
                other => log::debug!("setting `{other}` is not read by the mesh"),
            }
        }
    }
}

/// Force and energy scales of a spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// `Kv · V0^(5/3)`.
    pub grad_norm_factor: f64,
    /// `Kv · V0^2`.
    pub nrj_norm_factor: f64,
}

impl Normalization {
    /// Scales from the face reference values `vol_elasticity`,
    /// `prefered_area` and `prefered_height`.
    pub fn from_spec(spec: &ParamSpec) -> Result<Self> {
        let (kv, v0) = reference_volume(spec)?;
        Ok(Self {
            grad_norm_factor: kv * v0.powf(5.0 / 3.0),
            nrj_norm_factor: kv * v0.powi(2),
        })
    }
}

fn reference_volume(spec: &ParamSpec) -> Result<(f64, f64)> {
    const OWNER: &str = "dimensionalize";
    let kv = spec.require(OWNER, Element::Face, "vol_elasticity")?;
    let a0 = spec.require(OWNER, Element::Face, "prefered_area")?;
    let h0 = spec.require(OWNER, Element::Face, "prefered_height")?;
    Ok((kv, a0 * h0))
}

/// Convert a dimensionless spec to physical units.
///
/// The input is only read; the result is an independent deep copy.
pub fn dimensionalize(nondim: &ParamSpec) -> Result<ParamSpec> {
    let (kv, v0) = reference_volume(nondim)?;
    let norm = Normalization::from_spec(nondim)?;
    let mut dim = nondim.clone();

    if let Some(c) = dim.face.get_mut("contractility") {
        *c *= kv * v0.powf(4.0 / 3.0);
    }
    dim.set(Element::Face, "prefered_vol", v0);

    if let Some(t) = dim.edge.get_mut("line_tension") {
        *t *= norm.grad_norm_factor;
    }
    if let Some(t) = dim.vert.get_mut("radial_tension") {
        *t *= norm.grad_norm_factor;
    }

    dim.settings
        .insert("grad_norm_factor".into(), norm.grad_norm_factor);
    dim.settings
        .insert("nrj_norm_factor".into(), norm.nrj_norm_factor);
    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn adim_spec() -> ParamSpec {
        ParamSpec::default()
            .with(Element::Face, "contractility", 0.12)
            .with(Element::Face, "vol_elasticity", 1.0)
            .with(Element::Face, "prefered_height", 10.0)
            .with(Element::Face, "prefered_area", 24.0)
            .with(Element::Face, "prefered_vol", 240.0)
            .with(Element::Edge, "line_tension", 0.04)
            .with(Element::Vert, "radial_tension", 0.0)
            .with_setting("grad_norm_factor", 1.0)
            .with_setting("nrj_norm_factor", 1.0)
    }

    #[test]
    fn test_dimensionalize_scales_line_tension() {
        let nondim = adim_spec();
        let dim = dimensionalize(&nondim).unwrap();
        let expected = 0.04 * 1.0 * (24.0f64 * 10.0).powf(5.0 / 3.0);
        assert_relative_eq!(
            dim.get(Element::Edge, "line_tension").unwrap(),
            expected,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            dim.settings["grad_norm_factor"],
            240.0f64.powf(5.0 / 3.0),
            max_relative = 1e-12
        );
        assert_relative_eq!(dim.settings["nrj_norm_factor"], 240.0 * 240.0);
        assert_relative_eq!(
            dim.get(Element::Face, "contractility").unwrap(),
            0.12 * 240.0f64.powf(4.0 / 3.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_dimensionalize_leaves_input_unchanged() {
        let nondim = adim_spec();
        let before = nondim.clone();
        let _ = dimensionalize(&nondim).unwrap();
        assert_eq!(nondim, before);
        assert_eq!(nondim.get(Element::Edge, "line_tension"), Some(0.04));
    }

    #[test]
    fn test_dimensionalize_missing_reference() {
        let spec = ParamSpec::default().with(Element::Face, "vol_elasticity", 1.0);
        let err = dimensionalize(&spec).unwrap_err();
        assert!(matches!(err, MeshError::MissingAttribute { element: Element::Face, .. }));
    }

    #[test]
    fn test_spec_from_json() {
        let json = r#"{
            "vertex": {"radial_tension": 0.0},
            "edge": {"line_tension": 0.12},
            "face": {"contractility": 0.04, "prefered_area": 1.0},
            "settings": {"threshold_length": 0.001}
        }"#;
        let spec: ParamSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.get(Element::Vert, "radial_tension"), Some(0.0));
        assert_eq!(spec.get(Element::Edge, "line_tension"), Some(0.12));
        assert!(spec.cell.is_empty());

        let mut settings = Settings::default();
        settings.update(&spec.settings);
        assert_eq!(settings.threshold_length, 0.001);
        assert_eq!(settings.basal_shift, 0.0);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut a = ParamSpec::default().with(Element::Edge, "line_tension", 1.0);
        let b = ParamSpec::default()
            .with(Element::Edge, "line_tension", 2.0)
            .with(Element::Cell, "prefered_vol", 3.0);
        a.merge(&b);
        assert_eq!(a.get(Element::Edge, "line_tension"), Some(2.0));
        assert_eq!(a.get(Element::Cell, "prefered_vol"), Some(3.0));
    }
}
