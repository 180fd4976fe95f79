//! Tolerance-based cost comparison.
//!
//! Costs are USD doubles accumulated from many small charges, so exact
//! equality is meaningless. Every comparison in the engine goes through
//! these helpers.

/// Two costs within this distance are considered equal.
pub const COST_COMPARISON_TOLERANCE: f64 = 1e-6;

/// Whether two costs differ beyond the tolerance.
pub fn costs_differ(a: f64, b: f64) -> bool {
    (a - b).abs() > COST_COMPARISON_TOLERANCE
}

/// Whether `cost` exceeds `bound` beyond the tolerance.
pub fn cost_exceeds(cost: f64, bound: f64) -> bool {
    cost - bound > COST_COMPARISON_TOLERANCE
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::equal(100.0, 100.0, false)]
    #[case::within_tolerance(100.0, 100.0 + 1e-7, false)]
    #[case::tiny_negative(0.0, -1e-9, false)]
    #[case::cents(100.0, 100.01, true)]
    #[case::small_but_real(0.0, 1e-5, true)]
    fn test_costs_differ(#[case] a: f64, #[case] b: f64, #[case] expected: bool) {
        assert_eq!(costs_differ(a, b), expected);
        assert_eq!(costs_differ(b, a), expected);
    }

    #[rstest]
    #[case::above(300.01, 300.0, true)]
    #[case::exact(300.0, 300.0, false)]
    #[case::above_within_tolerance(300.0 + 1e-8, 300.0, false)]
    #[case::below(299.99, 300.0, false)]
    fn test_cost_exceeds(#[case] cost: f64, #[case] bound: f64, #[case] expected: bool) {
        assert_eq!(cost_exceeds(cost, bound), expected);
    }
}
