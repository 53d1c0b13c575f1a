// src/rng.rs
//! Random number plumbing for the Monte Carlo pricing path.
//!
//! Each simulated path owns a `StdRng` seeded from `base_seed + path_id`, so
//! results are reproducible and independent of the worker-thread schedule.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

pub fn seed_rng_from_u64(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = seed_rng_from_u64(42);
        let mut b = seed_rng_from_u64(42);
        for _ in 0..100 {
            assert_eq!(get_normal_draw(&mut a), get_normal_draw(&mut b));
        }
    }

    #[test]
    fn test_normal_draws_have_unit_moments() {
        let mut rng = seed_rng_from_u64(7);
        let samples: Vec<f64> = (0..10_000).map(|_| get_normal_draw(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((variance - 1.0).abs() < 0.05, "variance {}", variance);
    }
}
