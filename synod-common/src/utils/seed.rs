use rand::{rngs::OsRng, Rng, RngCore};

/// Fresh run seed from the operating system, used when none is configured.
pub fn generate_seed() -> u64 {
    OsRng.next_u64()
}

/// Draws one seed per process from the run's generator, in id order.
pub fn process_seeds<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<u64> {
    (0..n).map(|_| rng.gen::<u64>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_process_seeds_are_deterministic() {
        let a = process_seeds(&mut StdRng::seed_from_u64(42), 8);
        let b = process_seeds(&mut StdRng::seed_from_u64(42), 8);
        assert_eq!(a, b);
        assert_ne!(a, process_seeds(&mut StdRng::seed_from_u64(43), 8));
    }

    #[test]
    fn test_process_seeds_differ_per_process() {
        let seeds: std::collections::HashSet<u64> =
            process_seeds(&mut StdRng::seed_from_u64(42), 100).into_iter().collect();
        assert_eq!(seeds.len(), 100);
    }
}
