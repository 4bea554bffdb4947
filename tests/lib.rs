mod background;
mod linearization;
mod observations;
mod propagation;
mod scenarios;

use twin96::dynamics::Lorenz96;
use twin96::propagators::Propagator;
use twin96::state::ModelState;

/// Returns an n-variable Lorenz 96 model and an on-attractor state obtained
/// by integrating the bumped equilibrium for `spinup` MTU with the default
/// RK4 settings. Deterministic, so every test sees the same base state.
pub fn spun_up_l96(dimension: usize, spinup: f64) -> (Lorenz96, ModelState) {
    let model = Lorenz96::new(dimension, 8.0).unwrap();
    let start = model.perturbed_equilibrium(0.08);
    let prop = Propagator::default(model);
    let mut instance = prop.with(start);
    let mut state = instance.for_duration(spinup).unwrap();
    state.time = 0.0;
    (model, state)
}
