//! Particle state in PSO
//!
//! Every particle owns its own ChaCha8 stream (run seed, stream = particle
//! index), so its draws do not depend on how particles are scheduled.

use alloc::vec::Vec;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::config::PsoConfig;
use crate::fitness::{score, FitnessFunction};
use crate::projection::Projection;

/// Initial velocities are drawn from `±INIT_VELOCITY_SCALE · init_upper`.
pub const INIT_VELOCITY_SCALE: f64 = 0.1;

/// A candidate solution moving through the search space.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Current position (flattened candidate)
    pub(crate) position: Vec<f64>,
    /// Current velocity
    pub(crate) velocity: Vec<f64>,
    /// Fitness of the current position
    pub(crate) fitness: f64,
    /// Personal best position
    pub(crate) best_position: Vec<f64>,
    /// Personal best fitness
    pub(crate) best_fitness: f64,
    rng: ChaCha8Rng,
}

impl Particle {
    /// Draw a projected starting position and a small velocity, then score it.
    pub fn spawn<F, P>(
        index: usize,
        seed: u64,
        config: &PsoConfig,
        fitness: &F,
        projection: &P,
    ) -> Self
    where
        F: FitnessFunction + ?Sized,
        P: Projection + ?Sized,
    {
        let dim = fitness.dimension();
        let mut rng = particle_rng(seed, index);

        let upper = config.init_upper;
        let span = INIT_VELOCITY_SCALE * upper;
        let mut position: Vec<f64> = (0..dim).map(|_| rng.gen_range(0.0..upper)).collect();
        let mut velocity: Vec<f64> = (0..dim).map(|_| rng.gen_range(-span..span)).collect();
        if let Some(v_max) = config.max_velocity {
            clamp_velocity(&mut velocity, v_max);
        }
        projection.project(&mut position);

        let f = score(fitness, &position);
        Self {
            best_position: position.clone(),
            best_fitness: f,
            position,
            velocity,
            fitness: f,
            rng,
        }
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    /// Fitness of the current position
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn best_position(&self) -> &[f64] {
        &self.best_position
    }

    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    pub fn dimension(&self) -> usize {
        self.position.len()
    }

    pub(crate) fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Stream `index` of the ChaCha8 generator seeded with `seed`.
pub fn particle_rng(seed: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64);
    rng
}

pub(crate) fn clamp_velocity(velocity: &mut [f64], v_max: f64) {
    for v in velocity.iter_mut() {
        *v = v.clamp(-v_max, v_max);
    }
}

/// Pick the run seed: the configured one, or fresh entropy.
#[cfg(feature = "std")]
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rngs::OsRng.gen())
}

/// Without `std` there is no entropy source; unseeded runs use a fixed seed.
#[cfg(not(feature = "std"))]
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or(UNSEEDED_FALLBACK)
}

#[cfg(not(feature = "std"))]
const UNSEEDED_FALLBACK: u64 = 0x5eed_0f_5a_a4_11;
