//! Demand vector samples for property checks.

/// Deterministic pseudo-random demand vectors (xorshift64), `count` vectors
/// of `regions` entries in `0..=max`.
pub fn sample_demands(count: usize, regions: usize, max: u32) -> Vec<Vec<u32>> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..count)
        .map(|_| {
            (0..regions)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state % u64::from(max + 1)) as u32
                })
                .collect()
        })
        .collect()
}
