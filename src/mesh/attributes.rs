//! Per-element attribute schema and storage.
//!
//! Attributes are named scalar columns attached to one element kind. The set
//! of names is closed ([`Attr`]) and every element kind declares which names it
//! carries and their defaults ([`Element::schema`]). A table always holds every
//! column of its schema, so evaluation code never meets a missing attribute.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four element kinds of a tissue mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    /// Vertices (junction points).
    Vert,
    /// Oriented half-edges.
    Edge,
    /// Faces (polygonal boundaries).
    Face,
    /// Cells (bulk meshes only).
    Cell,
}

impl Element {
    /// All element kinds, leaf first.
    pub const ALL: [Element; 4] = [Element::Vert, Element::Edge, Element::Face, Element::Cell];

    /// Table name, as used in parameter specs.
    pub fn name(self) -> &'static str {
        match self {
            Element::Vert => "vert",
            Element::Edge => "edge",
            Element::Face => "face",
            Element::Cell => "cell",
        }
    }

    /// The attributes carried by this element kind, with their defaults.
    pub fn schema(self) -> &'static [(Attr, f64)] {
        match self {
            Element::Vert => &[
                (Attr::RadialTension, 0.0),
                (Attr::BorderElasticity, 0.0),
                (Attr::RestX, 0.0),
                (Attr::RestY, 0.0),
                (Attr::RestZ, 0.0),
            ],
            Element::Edge => &[
                (Attr::LineTension, 0.0),
                (Attr::LengthElasticity, 0.0),
                (Attr::PreferedLength, 1.0),
            ],
            Element::Face => &[
                (Attr::Contractility, 0.0),
                (Attr::AreaElasticity, 0.0),
                (Attr::PreferedArea, 1.0),
                (Attr::VolElasticity, 0.0),
                (Attr::PreferedVol, 1.0),
                (Attr::PreferedHeight, 1.0),
                (Attr::SurfaceTension, 0.0),
            ],
            Element::Cell => &[
                (Attr::AreaElasticity, 0.0),
                (Attr::PreferedArea, 1.0),
                (Attr::VolElasticity, 0.0),
                (Attr::PreferedVol, 1.0),
            ],
        }
    }

    /// Whether `attr` belongs to this element's schema.
    pub fn has(self, attr: Attr) -> bool {
        self.schema().iter().any(|&(a, _)| a == attr)
    }

    /// Look up an attribute of this element by name.
    pub fn attr(self, name: &str) -> Option<Attr> {
        let attr: Attr = name.parse().ok()?;
        self.has(attr).then_some(attr)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vert" | "vertex" => Ok(Element::Vert),
            "edge" => Ok(Element::Edge),
            "face" => Ok(Element::Face),
            "cell" => Ok(Element::Cell),
            other => Err(format!("unknown element `{other}`")),
        }
    }
}

/// Names of the scalar attributes an effector or behavior can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attr {
    /// Tension per unit length of a junction.
    LineTension,
    /// Spring constant of a junction length.
    LengthElasticity,
    /// Rest length of a junction.
    PreferedLength,
    /// Actomyosin contractility of a face perimeter.
    Contractility,
    /// Area elasticity (face or cell).
    AreaElasticity,
    /// Target area (face or cell).
    PreferedArea,
    /// Volume elasticity (face or cell).
    VolElasticity,
    /// Target volume (face or cell).
    PreferedVol,
    /// Target height of a sheet cell.
    PreferedHeight,
    /// Surface tension of a face.
    SurfaceTension,
    /// Apico-basal tension on a vertex.
    RadialTension,
    /// Spring constant pinning a border vertex.
    BorderElasticity,
    /// Rest position of a pinned vertex, x.
    RestX,
    /// Rest position of a pinned vertex, y.
    RestY,
    /// Rest position of a pinned vertex, z.
    RestZ,
}

impl Attr {
    /// Every attribute name.
    pub const ALL: [Attr; 15] = [
        Attr::LineTension,
        Attr::LengthElasticity,
        Attr::PreferedLength,
        Attr::Contractility,
        Attr::AreaElasticity,
        Attr::PreferedArea,
        Attr::VolElasticity,
        Attr::PreferedVol,
        Attr::PreferedHeight,
        Attr::SurfaceTension,
        Attr::RadialTension,
        Attr::BorderElasticity,
        Attr::RestX,
        Attr::RestY,
        Attr::RestZ,
    ];

    /// Column name.
    pub fn name(self) -> &'static str {
        match self {
            Attr::LineTension => "line_tension",
            Attr::LengthElasticity => "length_elasticity",
            Attr::PreferedLength => "prefered_length",
            Attr::Contractility => "contractility",
            Attr::AreaElasticity => "area_elasticity",
            Attr::PreferedArea => "prefered_area",
            Attr::VolElasticity => "vol_elasticity",
            Attr::PreferedVol => "prefered_vol",
            Attr::PreferedHeight => "prefered_height",
            Attr::SurfaceTension => "surface_tension",
            Attr::RadialTension => "radial_tension",
            Attr::BorderElasticity => "border_elasticity",
            Attr::RestX => "rest_x",
            Attr::RestY => "rest_y",
            Attr::RestZ => "rest_z",
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attr::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown attribute `{s}`"))
    }
}

/// Position of a vertex, half-edge or face within a monolayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Top surface.
    Apical,
    /// Bottom surface.
    Basal,
    /// Cell-cell interface.
    Lateral,
    /// Not labelled (flat sheets).
    #[default]
    Unset,
}

/// Schema-bound attribute columns of one table.
#[derive(Debug, Clone)]
pub(crate) struct Columns {
    element: Element,
    data: BTreeMap<Attr, Vec<f64>>,
}

impl Columns {
    /// Columns filled with schema defaults for `len` rows.
    pub(crate) fn new(element: Element, len: usize) -> Self {
        let data = element
            .schema()
            .iter()
            .map(|&(attr, default)| (attr, vec![default; len]))
            .collect();
        Self { element, data }
    }

    pub(crate) fn element(&self) -> Element {
        self.element
    }

    /// Column for `attr`. `None` when the element does not carry it.
    pub(crate) fn get(&self, attr: Attr) -> Option<&[f64]> {
        self.data.get(&attr).map(Vec::as_slice)
    }

    pub(crate) fn get_mut(&mut self, attr: Attr) -> Option<&mut [f64]> {
        self.data.get_mut(&attr).map(Vec::as_mut_slice)
    }

    /// Append a row with schema defaults.
    pub(crate) fn push_default(&mut self) {
        for &(attr, default) in self.element.schema() {
            if let Some(col) = self.data.get_mut(&attr) {
                col.push(default);
            }
        }
    }

    /// Append a copy of row `template`.
    pub(crate) fn push_copy(&mut self, template: usize) {
        for col in self.data.values_mut() {
            let value = col[template];
            col.push(value);
        }
    }

    /// Set every row of a column.
    pub(crate) fn fill(&mut self, attr: Attr, value: f64) {
        if let Some(col) = self.data.get_mut(&attr) {
            col.iter_mut().for_each(|v| *v = value);
        }
    }

    /// Drop the rows flagged in `removed`.
    pub(crate) fn retain(&mut self, removed: &[bool]) {
        for col in self.data.values_mut() {
            retain_rows(col, removed);
        }
    }

    /// Length of every column, used by the validator.
    pub(crate) fn lengths(&self) -> impl Iterator<Item = (Attr, usize)> + '_ {
        self.data.iter().map(|(&a, c)| (a, c.len()))
    }
}

/// Remove the rows of `rows` flagged in `removed`, keeping the order of the rest.
pub(crate) fn retain_rows<T>(rows: &mut Vec<T>, removed: &[bool]) {
    let mut i = 0;
    rows.retain(|_| {
        let keep = !removed.get(i).copied().unwrap_or(false);
        i += 1;
        keep
    });
}
