//! Shared edge hit-count map.

use thiserror::Error;

use crate::MAP_SIZE;

/// Map construction error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("coverage map size {0} is not a non-zero power of two")]
    NotPowerOfTwo(usize),
}

/// Byte-per-edge hit counters.
///
/// Counters wrap at 256. Instrumented code indexes the map with an
/// unmasked edge id, so the size must be a power of two no smaller than
/// the range location ids are drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMap {
    cells: Vec<u8>,
}

impl CoverageMap {
    /// Allocate a zeroed map of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `MapError::NotPowerOfTwo` if `size` is zero or not a power
    /// of two.
    pub fn new(size: usize) -> Result<Self, MapError> {
        if !size.is_power_of_two() {
            return Err(MapError::NotPowerOfTwo(size));
        }
        Ok(Self {
            cells: vec![0; size],
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Hit count of one cell.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied()
    }

    /// Number of cells hit at least once (modulo counter wrap).
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// `(index, count)` for every non-zero cell, in index order.
    pub fn hit_cells(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0)
            .map(|(i, c)| (i, *c))
    }

    /// Clear every counter.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.cells
    }
}

impl Default for CoverageMap {
    fn default() -> Self {
        Self {
            cells: vec![0; MAP_SIZE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(CoverageMap::default().len(), MAP_SIZE);
        assert!(CoverageMap::new(1).is_ok());
        assert!(CoverageMap::new(1 << 10).is_ok());
        assert_eq!(CoverageMap::new(0), Err(MapError::NotPowerOfTwo(0)));
        assert_eq!(CoverageMap::new(1000), Err(MapError::NotPowerOfTwo(1000)));
    }

    #[test]
    fn test_hits_and_reset() {
        let mut map = CoverageMap::new(16).expect("power of two");
        map.as_mut_slice()[3] = 2;
        map.as_mut_slice()[9] = 1;
        assert_eq!(map.get(3), Some(2));
        assert_eq!(map.get(16), None);
        assert_eq!(map.count_nonzero(), 2);
        assert_eq!(map.hit_cells().collect::<Vec<_>>(), vec![(3, 2), (9, 1)]);

        map.reset();
        assert_eq!(map.count_nonzero(), 0);
        assert_eq!(map.hit_cells().next(), None);
    }
}
