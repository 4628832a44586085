use crate::tableau::Tableau;
use crate::traits::{constant, DynamicalSystem, Scalar, Steppable};

/// Explicit Runge-Kutta solver driven by a Butcher tableau.
///
/// Owns one derivative buffer per stage plus one trial-state buffer; they are
/// sized on construction and reused by every step.
pub struct ExplicitRungeKutta<T: Scalar> {
    offsets: Vec<T>,
    weights: Vec<Vec<T>>,
    output: Vec<T>,
    k: Vec<Vec<T>>,
    tmp: Vec<T>,
}

impl<T: Scalar> ExplicitRungeKutta<T> {
    pub fn new(tableau: &Tableau, dim: usize) -> Self {
        let stages = tableau.stages();
        let z = T::zero();
        Self {
            offsets: (0..stages).map(|s| constant(tableau.offset(s))).collect(),
            weights: (0..stages)
                .map(|s| {
                    tableau
                        .stage_weights(s)
                        .iter()
                        .map(|&a| constant(a))
                        .collect()
                })
                .collect(),
            output: tableau
                .output_weights()
                .iter()
                .map(|&b| constant(b))
                .collect(),
            k: vec![vec![z; dim]; stages],
            tmp: vec![z; dim],
        }
    }

    pub fn stages(&self) -> usize {
        self.k.len()
    }
}

impl<T: Scalar> Steppable<T> for ExplicitRungeKutta<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;

        // k_0 = f(t, y)
        system.apply(t0, state, &mut self.k[0]);

        // k_i = f(t + c_i*dt, y + dt * sum_j a_ij * k_{j-1})
        for stage in 1..self.k.len() {
            let (done, rest) = self.k.split_at_mut(stage);
            let weights = &self.weights[stage];
            for i in 0..state.len() {
                let mut acc = T::zero();
                for (a, k) in weights.iter().zip(done.iter()) {
                    acc = acc + *a * k[i];
                }
                self.tmp[i] = state[i] + dt * acc;
            }
            system.apply(t0 + self.offsets[stage] * dt, &self.tmp, &mut rest[0]);
        }

        // y_next = y + dt * sum_i b_i * k_{i-1}
        for i in 0..state.len() {
            let mut acc = T::zero();
            for (b, k) in self.output.iter().zip(self.k.iter()) {
                acc = acc + *b * k[i];
            }
            state[i] = state[i] + dt * acc;
        }

        *t = t0 + dt;
    }
}

/// Takes a single step from `(t, state)` and returns the new state.
///
/// Convenience wrapper that builds a fresh [`ExplicitRungeKutta`]; loops
/// should hold a solver and call [`Steppable::step`] instead.
pub fn integrate<T: Scalar>(
    tableau: &Tableau,
    system: &impl DynamicalSystem<T>,
    state: &[T],
    t: T,
    h: T,
) -> Vec<T> {
    let mut solver = ExplicitRungeKutta::new(tableau, state.len());
    let mut next = state.to_vec();
    let mut time = t;
    solver.step(system, &mut time, &mut next, h);
    next
}
