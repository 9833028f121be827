//! Property-based tests for expression evaluation.
//!
//! The evaluator fronts model-generated input, so the properties focus on
//! totality (no panic on any input) and on the formatting contract for
//! results that do come back.

use super::{evaluate, EvalError};
use proptest::prelude::*;

fn arb_small_int() -> impl Strategy<Value = i64> {
    -1000i64..1000
}

fn arb_expression_text() -> impl Strategy<Value = String> {
    prop_oneof![
        // Arbitrary printable ASCII, mostly garbage.
        "[ -~]{0,40}",
        // Strings biased toward the expression alphabet.
        "[0-9+\\-*/(), .a-z]{0,40}",
    ]
}

proptest! {
    /// Evaluation is total: any input produces Ok or Err, never a panic.
    #[test]
    fn prop_never_panics(input in arb_expression_text()) {
        let _ = evaluate(&input);
    }

    /// Integer literals round-trip through evaluation unchanged.
    #[test]
    fn prop_integer_literals_round_trip(n in arb_small_int()) {
        prop_assert_eq!(evaluate(&n.to_string()).unwrap(), n.to_string());
    }

    /// Integral results never carry a decimal point.
    #[test]
    fn prop_integral_sums_have_no_point(a in arb_small_int(), b in arb_small_int()) {
        let result = evaluate(&format!("{a} + {b}")).unwrap();
        prop_assert_eq!(&result, &(a + b).to_string());
        prop_assert!(!result.contains('.'));
    }

    /// Parenthesized products agree with native arithmetic.
    #[test]
    fn prop_products(a in arb_small_int(), b in arb_small_int()) {
        let result = evaluate(&format!("({a}) * ({b})")).unwrap();
        prop_assert_eq!(result, (a * b).to_string());
    }

    /// Fractional results are trimmed: no trailing zeros, no dangling point,
    /// and the text still parses back to (approximately) the quotient.
    #[test]
    fn prop_quotient_formatting(num in 1i64..1000, den in 1i64..1000) {
        let result = evaluate(&format!("{num} / {den}")).unwrap();
        if result.contains('.') {
            prop_assert!(!result.ends_with('0'));
            prop_assert!(!result.ends_with('.'));
        }
        let parsed: f64 = result.parse().unwrap();
        let expected = num as f64 / den as f64;
        prop_assert!((parsed - expected).abs() < 1e-9);
    }

    /// Any input containing a denylisted substring is rejected as unsafe,
    /// whatever surrounds it.
    #[test]
    fn prop_denylist_rejects(prefix in "[a-z0-9 ]{0,8}", suffix in "[a-z0-9 ]{0,8}") {
        let input = format!("{prefix}eval{suffix}");
        prop_assert!(matches!(
            evaluate(&input).unwrap_err(),
            EvalError::UnsafeInput(_)
        ));
    }
}
