//! Tick-to-sample conversion

/// Samples to generate per song tick, rounded to the nearest integer.
///
/// Uses the engine's real output rate: the OPL's timbre depends on it, so the
/// rate is never assumed. Clamped to at least one sample so that a very low
/// output rate still advances through delays.
pub fn samples_per_tick(sample_rate: u32, tick_rate_hz: u32) -> u32 {
    let tick_rate = tick_rate_hz.max(1) as u64;
    // round half up
    let rounded = (sample_rate as u64 * 2 + tick_rate) / (tick_rate * 2);
    rounded.clamp(1, u32::MAX as u64) as u32
}

/// Samples covering a delay of `delay_ticks`
#[inline]
pub fn delay_samples(delay_ticks: u16, samples_per_tick: u32) -> u64 {
    delay_ticks as u64 * samples_per_tick as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_rates() {
        assert_eq!(samples_per_tick(44_100, 560), 79); // 78.75
        assert_eq!(samples_per_tick(48_000, 560), 86); // 85.71
        assert_eq!(samples_per_tick(49_716, 560), 89); // 88.78
        assert_eq!(samples_per_tick(49_716, 700), 71); // 71.02
        assert_eq!(samples_per_tick(44_100, 700), 63);
    }

    #[test]
    fn test_half_rounds_up() {
        assert_eq!(samples_per_tick(5, 2), 3);
        assert_eq!(samples_per_tick(7, 2), 4);
    }

    #[test]
    fn test_low_rate_clamped_to_one() {
        assert_eq!(samples_per_tick(100, 560), 1);
        assert_eq!(samples_per_tick(0, 700), 1);
        assert_eq!(samples_per_tick(44_100, 0), 44_100);
    }

    #[test]
    fn test_delay_samples() {
        assert_eq!(delay_samples(0, 79), 0);
        assert_eq!(delay_samples(u16::MAX, 79), 65_535 * 79);
    }
}
