//! Velocity and position update rule

use rand::Rng;

use crate::config::PsoConfig;
use crate::fitness::{score, FitnessFunction};
use crate::particle::{clamp_velocity, Particle};
use crate::projection::Projection;

/// Inertia-weighted PSO update:
///
/// `v ← w·v + c1·r1∘(pbest − x) + c2·r2∘(gbest − x)`, `x ← P(x + v)`
///
/// with fresh `r1, r2 ∈ [0, 1)` per entry and `P` the projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRule {
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
    pub max_velocity: Option<f64>,
}

impl UpdateRule {
    pub fn from_config(config: &PsoConfig) -> Self {
        Self {
            inertia: config.inertia,
            cognitive: config.cognitive,
            social: config.social,
            max_velocity: config.max_velocity,
        }
    }

    /// Move one particle towards its personal best and `global_best`, project,
    /// re-evaluate, and keep the new position as personal best on strict
    /// improvement. Returns whether the personal best improved.
    pub fn step<F, P>(
        &self,
        particle: &mut Particle,
        global_best: &[f64],
        fitness: &F,
        projection: &P,
    ) -> bool
    where
        F: FitnessFunction + ?Sized,
        P: Projection + ?Sized,
    {
        debug_assert_eq!(particle.position.len(), global_best.len());

        for d in 0..particle.position.len() {
            let r1: f64 = particle.rng().gen();
            let r2: f64 = particle.rng().gen();
            let x = particle.position[d];
            particle.velocity[d] = self.inertia * particle.velocity[d]
                + self.cognitive * r1 * (particle.best_position[d] - x)
                + self.social * r2 * (global_best[d] - x);
        }
        if let Some(v_max) = self.max_velocity {
            clamp_velocity(&mut particle.velocity, v_max);
        }
        for (x, v) in particle.position.iter_mut().zip(&particle.velocity) {
            *x += *v;
        }
        projection.project(&mut particle.position);

        let f = score(fitness, &particle.position);
        particle.fitness = f;
        if f < particle.best_fitness {
            particle.best_fitness = f;
            particle.best_position.copy_from_slice(&particle.position);
            true
        } else {
            false
        }
    }
}
