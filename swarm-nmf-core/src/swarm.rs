//! Swarm state and the per-iteration reduction
//!
//! Within one iteration every particle moves against the same snapshot of the
//! global best. The global best is reduced once, after all particles have been
//! evaluated, by scanning personal bests in particle order (lowest index wins
//! ties). Sequential and `parallel` builds therefore produce identical runs.

use alloc::vec::Vec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::PsoConfig;
use crate::fitness::FitnessFunction;
use crate::particle::Particle;
use crate::projection::Projection;
use crate::update::UpdateRule;

/// The particle population plus the global best.
#[derive(Debug, Clone)]
pub struct Swarm {
    particles: Vec<Particle>,
    global_best_position: Vec<f64>,
    global_best_fitness: f64,
    iteration: usize,
}

impl Swarm {
    /// Spawn `config.population_size` particles and seed the global best from them.
    pub fn initialize<F, P>(config: &PsoConfig, seed: u64, fitness: &F, projection: &P) -> Self
    where
        F: FitnessFunction + ?Sized,
        P: Projection + ?Sized,
    {
        let particles: Vec<Particle> = (0..config.population_size)
            .map(|i| Particle::spawn(i, seed, config, fitness, projection))
            .collect();

        let mut swarm = Self {
            global_best_position: particles
                .first()
                .map(|p| p.best_position.clone())
                .unwrap_or_default(),
            global_best_fitness: f64::INFINITY,
            particles,
            iteration: 0,
        };
        if let Some(first) = swarm.particles.first() {
            swarm.global_best_fitness = first.best_fitness;
        }
        swarm.reduce_global_best();
        swarm
    }

    /// Run one update pass over every particle, then reduce the global best.
    /// Returns whether the global best strictly improved.
    pub fn step<F, P>(&mut self, rule: &UpdateRule, fitness: &F, projection: &P) -> bool
    where
        F: FitnessFunction + ?Sized,
        P: Projection + ?Sized,
    {
        let global_best = &self.global_best_position;

        #[cfg(feature = "parallel")]
        self.particles.par_iter_mut().for_each(|particle| {
            rule.step(particle, global_best, fitness, projection);
        });

        #[cfg(not(feature = "parallel"))]
        for particle in self.particles.iter_mut() {
            rule.step(particle, global_best, fitness, projection);
        }

        self.iteration += 1;
        self.reduce_global_best()
    }

    /// Single-writer reduction: adopt the best personal best if it is strictly
    /// better than the current global best.
    fn reduce_global_best(&mut self) -> bool {
        let mut best: Option<usize> = None;
        let mut best_fitness = self.global_best_fitness;
        for (i, p) in self.particles.iter().enumerate() {
            if p.best_fitness < best_fitness {
                best_fitness = p.best_fitness;
                best = Some(i);
            }
        }
        match best {
            Some(i) => {
                self.global_best_fitness = best_fitness;
                self.global_best_position
                    .clone_from(&self.particles[i].best_position);
                true
            }
            None => false,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of particles; fixed for the lifetime of the swarm
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn global_best_position(&self) -> &[f64] {
        &self.global_best_position
    }

    pub fn global_best_fitness(&self) -> f64 {
        self.global_best_fitness
    }

    /// Completed update passes
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub(crate) fn into_best(self) -> (Vec<f64>, f64) {
        (self.global_best_position, self.global_best_fitness)
    }
}
