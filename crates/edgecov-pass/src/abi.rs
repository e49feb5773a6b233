//! Contract shared between instrumented code and the coverage runtime.

/// Log2 of the coverage map size.
pub const MAP_SIZE_POW2: u32 = 16;

/// Coverage map size in bytes. Must stay a power of two: edge ids are the
/// XOR of two values below `MAP_SIZE`, which only stays below `MAP_SIZE`
/// when no bit above `MAP_SIZE_POW2` can be set.
pub const MAP_SIZE: usize = 1 << MAP_SIZE_POW2;

/// Pointer to the coverage map, set by the runtime before any
/// instrumented code runs.
pub const AREA_PTR_SYMBOL: &str = "__afl_area_ptr";

/// Previous location register, `cur_loc >> 1` of the last executed block.
pub const PREV_LOC_SYMBOL: &str = "__afl_prev_loc";

/// Map offset updated when a block with `cur_loc` runs after a block that
/// left `prev_loc` behind.
#[must_use]
pub const fn edge_index(cur_loc: u32, prev_loc: u16) -> usize {
    (cur_loc ^ prev_loc as u32) as usize
}

/// Value a block with `cur_loc` leaves in the previous location register.
///
/// Halving keeps `A -> B` distinct from `B -> A` and keeps the self-loop
/// `A -> A` away from cell 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn next_prev_loc(cur_loc: u32) -> u16 {
    (cur_loc >> 1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_size_is_power_of_two() {
        assert!(MAP_SIZE.is_power_of_two());
        assert_eq!(MAP_SIZE, 65536);
    }

    #[test]
    fn test_edge_after_other_block() {
        // B (cur_loc 100) then A (cur_loc 300).
        let prev = next_prev_loc(100);
        assert_eq!(prev, 50);
        assert_eq!(edge_index(300, prev), 286);
        assert_eq!(next_prev_loc(300), 150);
    }

    #[test]
    fn test_self_loop_is_not_zero() {
        let prev = next_prev_loc(300);
        assert_eq!(edge_index(300, prev), 442);
    }

    #[test]
    fn test_direction_matters() {
        let a = 0x1234;
        let b = 0x0f0f;
        assert_ne!(
            edge_index(b, next_prev_loc(a)),
            edge_index(a, next_prev_loc(b))
        );
    }

    #[test]
    fn test_edge_index_in_range() {
        let max = u32::try_from(MAP_SIZE - 1).expect("map size fits u32");
        for cur in [0, 1, 300, max / 2, max] {
            for prev_src in [0, 7, 300, max] {
                assert!(edge_index(cur, next_prev_loc(prev_src)) < MAP_SIZE);
            }
        }
    }
}
