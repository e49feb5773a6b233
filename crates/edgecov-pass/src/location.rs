//! Location ids and instrumentation density.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::abi::MAP_SIZE;
use crate::config::InstRatio;

/// Draws location ids and decides which eligible blocks get instrumented.
///
/// Ids are uniform in `[0, map_size)` and need not be unique; two blocks
/// sharing an id only merge their edges in the map.
pub struct LocationAllocator {
    rng: SmallRng,
    ratio: InstRatio,
    map_size: u32,
}

impl LocationAllocator {
    /// Allocator for the default map size, seeded from OS entropy.
    #[must_use]
    pub fn new(ratio: InstRatio) -> Self {
        Self::with_rng(SmallRng::from_entropy(), ratio)
    }

    /// Allocator with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64, ratio: InstRatio) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), ratio)
    }

    fn with_rng(rng: SmallRng, ratio: InstRatio) -> Self {
        Self {
            rng,
            ratio,
            map_size: u32::try_from(MAP_SIZE).unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub const fn ratio(&self) -> InstRatio {
        self.ratio
    }

    /// Roll the density dice for one eligible block. On admission, returns
    /// its location id.
    pub fn admit(&mut self) -> Option<u32> {
        if self.rng.gen_range(0..100) >= self.ratio.percent() {
            return None;
        }
        Some(self.rng.gen_range(0..self.map_size))
    }
}
