//! Energy functional of the vertex model.
//!
//! - [`effectors`]: the individual energy terms and their analytic gradients
//! - [`Model`]: an ordered set of effectors evaluated together
//! - [`specs`]: parameter specs, mesh settings and unit scaling

pub mod effectors;
mod model;
pub mod specs;

#[cfg(test)]
pub(crate) mod testing;

pub use effectors::{
    BorderElasticity, CellAreaElasticity, CellVolumeElasticity, Effector, FaceAreaElasticity,
    FaceContractility, FaceVolumeElasticity, Gradient, LengthElasticity, LineTension,
    RadialTension, SurfaceTension,
};
pub use model::{EnergyBreakdown, EnergyTerm, GradientBreakdown, GradientTerm, Model};
pub use specs::{dimensionalize, Normalization, ParamSpec, Settings};
