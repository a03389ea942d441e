//! Deterministic RNG for projection initialization.
//!
//! Seeded projection tables draw every weight from PCG32 streams. Each band
//! gets its own stream whose seed is derived from the base seed with BLAKE3,
//! so changing one band's layer size never shifts another band's weights.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use stylemix_spec::{derive_band_seed, BandName};

/// Creates a PCG32 RNG from a 32-bit seed.
///
/// The seed is duplicated into both halves of the 64-bit PCG state seed.
pub fn create_rng(seed: u32) -> Pcg32 {
    let seed64 = (seed as u64) | ((seed as u64) << 32);
    Pcg32::seed_from_u64(seed64)
}

/// Creates the RNG stream for one band's projection.
pub fn create_band_rng(base_seed: u32, band: BandName) -> Pcg32 {
    create_rng(derive_band_seed(base_seed, band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_rng_determinism() {
        let mut a = create_rng(42);
        let mut b = create_rng(42);
        let va: Vec<f32> = (0..32).map(|_| a.gen()).collect();
        let vb: Vec<f32> = (0..32).map(|_| b.gen()).collect();
        assert_eq!(va, vb);
    }

    #[test]
    fn test_band_streams_independent() {
        let mut style = create_band_rng(7, BandName::Style);
        let mut color = create_band_rng(7, BandName::Color);
        let vs: Vec<u32> = (0..8).map(|_| style.gen()).collect();
        let vc: Vec<u32> = (0..8).map(|_| color.gen()).collect();
        assert_ne!(vs, vc);
    }
}
