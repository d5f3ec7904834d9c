//! Clock Solver
//!
//! Matches requested pixel clocks against hardware with a fixed table of
//! discrete clocks. Programmable-clock hardware never comes through
//! here; the validator checks its ranges directly.

use tracing::trace;

/// One pixel clock range a driver accepts.
///
/// Ranges form an ordered list; the first range that structurally
/// matches a mode wins and its `private` value is copied onto the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockRange {
    /// Minimum pixel clock in kHz
    pub min_clock: u32,
    /// Maximum pixel clock in kHz
    pub max_clock: u32,
    /// Interlaced modes allowed in this range
    pub allow_interlace: bool,
    /// Doublescan modes allowed in this range
    pub allow_doublescan: bool,
    /// A divide-by-two post-scaler is available
    pub allow_clock_div2: bool,
    /// Clock multiplier factor, >= 1
    pub clock_mul: u32,
    /// Clock divisor factor, >= 1
    pub clock_div: u32,
    /// Opaque driver flags copied onto matched modes
    pub private: i32,
}

impl Default for ClockRange {
    fn default() -> Self {
        ClockRange {
            min_clock: 0,
            max_clock: u32::MAX,
            allow_interlace: true,
            allow_doublescan: true,
            allow_clock_div2: false,
            clock_mul: 1,
            clock_div: 1,
            private: 0,
        }
    }
}

impl ClockRange {
    /// An unconstrained range spanning `[min, max]` kHz.
    pub fn spanning(min_clock: u32, max_clock: u32) -> Self {
        ClockRange {
            min_clock,
            max_clock,
            ..Default::default()
        }
    }

    /// Whether `clock` (kHz) lies within this range's bounds.
    pub fn contains_clock(&self, clock: u32) -> bool {
        clock >= self.min_clock && clock <= self.max_clock
    }
}

/// A discrete clock choice for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearestClock {
    /// Index into the clock table
    pub index: usize,
    /// Whether the divide-by-two post-scaler is engaged
    pub div2: bool,
}

/// Find the table entry closest to `target` kHz.
///
/// Minimizes `|target * j - table[i] * div / mul|` over every table
/// index `i` and `j in {1, 2}` (2 only when the range allows the
/// post-scaler), preferring `j = 1` and lower indices on ties. This is
/// an exhaustive scan; clock tables are tiny.
pub fn nearest_clock(table: &[u32], target: u32, range: &ClockRange) -> Option<NearestClock> {
    if table.is_empty() {
        return None;
    }
    let mul = range.clock_mul.max(1) as u64;
    let div = range.clock_div.max(1) as u64;

    let mut best: Option<(u64, NearestClock)> = None;
    let dividers: &[u64] = if range.allow_clock_div2 { &[1, 2] } else { &[1] };
    for &j in dividers {
        for (i, &entry) in table.iter().enumerate() {
            // Compare |target*j - entry*div/mul| scaled by mul to stay
            // in integers: |target*j*mul - entry*div|.
            let scaled_target = target as u64 * j * mul;
            let scaled_entry = entry as u64 * div;
            let gap = scaled_target.abs_diff(scaled_entry);
            if best.map_or(true, |(g, _)| gap < g) {
                best = Some((gap, NearestClock { index: i, div2: j == 2 }));
            }
        }
    }
    if let Some((gap, choice)) = best {
        trace!(target, index = choice.index, div2 = choice.div2, gap, "nearest clock");
    }
    best.map(|(_, c)| c)
}

/// The pixel clock actually produced by a [`NearestClock`] choice, kHz.
pub fn realized_clock(table: &[u32], range: &ClockRange, choice: NearestClock) -> u32 {
    let mul = range.clock_mul.max(1) as u64;
    let div = range.clock_div.max(1) as u64;
    let base = table[choice.index] as u64 * div / mul;
    let scaled = if choice.div2 { base / 2 } else { base };
    scaled.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry_always_wins() {
        let range = ClockRange::default();
        for target in [1, 25_175, 65_000, 400_000] {
            let c = nearest_clock(&[108_000], target, &range);
            assert_eq!(c, Some(NearestClock { index: 0, div2: false }));
        }
    }

    #[test]
    fn test_exact_match_has_zero_gap() {
        let table = [25_175, 40_000, 65_000, 108_000];
        let range = ClockRange::default();
        let c = nearest_clock(&table, 65_000, &range).unwrap();
        assert_eq!(c.index, 2);
        assert_eq!(realized_clock(&table, &range, c), 65_000);
    }

    #[test]
    fn test_prefers_plain_clock_on_tie() {
        // 50_000 direct vs 100_000 halved both realize 50 MHz; j = 1
        // must win.
        let table = [50_000, 100_000];
        let range = ClockRange {
            allow_clock_div2: true,
            ..Default::default()
        };
        let c = nearest_clock(&table, 50_000, &range).unwrap();
        assert_eq!(c, NearestClock { index: 0, div2: false });
    }

    #[test]
    fn test_div2_reaches_low_targets() {
        let table = [100_000, 120_000];
        let range = ClockRange {
            allow_clock_div2: true,
            ..Default::default()
        };
        let c = nearest_clock(&table, 50_000, &range).unwrap();
        assert_eq!(c, NearestClock { index: 0, div2: true });
        assert_eq!(realized_clock(&table, &range, c), 50_000);
    }

    #[test]
    fn test_mul_div_factors_scale_comparison() {
        // With mul=2, div=1 the table entries effectively halve.
        let table = [100_000, 200_000];
        let range = ClockRange {
            clock_mul: 2,
            clock_div: 1,
            ..Default::default()
        };
        let c = nearest_clock(&table, 100_000, &range).unwrap();
        assert_eq!(c.index, 1);
        assert_eq!(realized_clock(&table, &range, c), 100_000);
    }

    #[test]
    fn test_empty_table_yields_none() {
        assert!(nearest_clock(&[], 65_000, &ClockRange::default()).is_none());
    }
}
