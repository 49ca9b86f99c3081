//! Finite-difference checks for effector gradients.

use nalgebra::Vector3;
use rand::Rng;

use super::effectors::Effector;
use crate::geometry::update_all;
use crate::mesh::{Mesh, MeshKind};

const STEP: f64 = 1e-6;
const TOLERANCE: f64 = 1e-5;
const ROUNDS: usize = 3;

fn noise(mesh: &Mesh, scale: f64, rng: &mut impl Rng) -> Vec<Vector3<f64>> {
    let planar = mesh.kind() == MeshKind::Planar;
    (0..mesh.nv())
        .map(|_| {
            let z = if planar { 0.0 } else { rng.gen_range(-scale..scale) };
            Vector3::new(rng.gen_range(-scale..scale), rng.gen_range(-scale..scale), z)
        })
        .collect()
}

/// Jitter positions and draw the effector's coefficients at random, so no
/// term sits at a symmetric or rest configuration.
pub(crate) fn randomize(mesh: &mut Mesh, effector: &dyn Effector, rng: &mut impl Rng) {
    let delta = noise(mesh, 0.1, rng);
    mesh.displace(&delta).unwrap();
    for &(attr, _) in effector.attributes() {
        for x in mesh.attr_mut(effector.element(), attr) {
            *x = rng.gen_range(0.5..1.5);
        }
    }
}

fn total_energy(mesh: &mut Mesh, effector: &dyn Effector) -> f64 {
    update_all(mesh);
    let geom = mesh.geometry().unwrap();
    effector.energy(mesh, geom).iter().sum()
}

/// Compare the analytic gradient against central differences at a few
/// random displacements of `mesh`.
pub(crate) fn check_gradient(mesh: &Mesh, effector: &dyn Effector, rng: &mut impl Rng) {
    for _ in 0..ROUNDS {
        let mut moved = mesh.clone();
        let delta = noise(&moved, 0.05, rng);
        moved.displace(&delta).unwrap();

        update_all(&mut moved);
        let analytic = effector
            .gradient(&moved, moved.geometry().unwrap())
            .per_vertex(&moved);

        for v in moved.vert_ids().collect::<Vec<_>>() {
            let origin = moved.position(v);
            for axis in 0..3 {
                let mut p = origin;
                p[axis] += STEP;
                moved.set_position(v, p);
                let plus = total_energy(&mut moved, effector);
                p[axis] -= 2.0 * STEP;
                moved.set_position(v, p);
                let minus = total_energy(&mut moved, effector);
                moved.set_position(v, origin);

                let numeric = (plus - minus) / (2.0 * STEP);
                let exact = analytic[v.index()][axis];
                assert!(
                    (numeric - exact).abs() <= TOLERANCE * (1.0 + exact.abs()),
                    "{}: d/d{}[{:?}] analytic {} vs numeric {}",
                    effector.label(),
                    ["x", "y", "z"][axis],
                    v,
                    exact,
                    numeric
                );
            }
        }
    }
}
