//! Unit tests for the Money module
//!
//! Tests cover creation, arithmetic, explicit rounding and unit pricing.

use core_kernel::{Money, MoneyError, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_keeps_full_precision() {
        let m = Money::new(dec!(100.123456789));
        assert_eq!(m.amount(), dec!(100.123456789));
    }

    #[test]
    fn test_from_minor_converts_kopecks() {
        let m = Money::from_minor(10050);
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_zero_and_default_agree() {
        assert!(Money::zero().is_zero());
        assert_eq!(Money::default(), Money::zero());
    }

    #[test]
    fn test_sign_predicates() {
        assert!(Money::new(dec!(0.01)).is_positive());
        assert!(Money::new(dec!(-0.01)).is_negative());
        assert!(!Money::zero().is_positive());
        assert!(!Money::zero().is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_add_sub_neg() {
        let a = Money::new(dec!(100));
        let b = Money::new(dec!(40));

        assert_eq!((a + b).amount(), dec!(140));
        assert_eq!((a - b).amount(), dec!(60));
        assert_eq!((-a).amount(), dec!(-100));
    }

    #[test]
    fn test_assign_operators() {
        let mut m = Money::new(dec!(10));
        m += Money::new(dec!(5));
        m -= Money::new(dec!(2.5));
        assert_eq!(m.amount(), dec!(12.5));
    }

    #[test]
    fn test_sum_of_amounts() {
        let total: Money = vec![dec!(1.10), dec!(2.20), dec!(3.30)]
            .into_iter()
            .map(Money::new)
            .sum();
        assert_eq!(total.amount(), dec!(6.60));
    }

    #[test]
    fn test_multiply_by_quantity() {
        let unit = Money::new(dec!(14));
        assert_eq!((unit * dec!(5)).amount(), dec!(70));
    }

    #[test]
    fn test_divide_by_zero_is_error() {
        assert_eq!(Money::new(dec!(1)).divide(Decimal::ZERO), Err(MoneyError::DivisionByZero));
    }
}

mod rounding {
    use super::*;

    #[test]
    fn test_half_up_rounds_midpoint_away_from_zero() {
        assert_eq!(Money::new(dec!(0.125)).round_half_up().amount(), dec!(0.13));
        assert_eq!(Money::new(dec!(0.124)).round_half_up().amount(), dec!(0.12));
    }

    #[test]
    fn test_unit_cost_times_quantity_rounds_back() {
        let batch_total = Money::new(dec!(100));
        let unit = batch_total.per_unit(dec!(3)).unwrap();
        assert_eq!((unit * dec!(3)).round_half_up().amount(), dec!(100.00));
    }

    #[test]
    fn test_display_shows_two_places() {
        assert_eq!(Money::new(dec!(170)).to_string(), "170.00");
        assert_eq!(Money::new(dec!(1.005)).round_half_up().to_string(), "1.01");
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_vat_rate_apply() {
        let vat = Rate::new(dec!(0.20));
        let charge = vat.apply(&Money::new(dec!(1000)));
        assert_eq!(charge.amount(), dec!(200));
    }

    #[test]
    fn test_gross_to_net_with_multiplier() {
        let vat = Rate::new(dec!(0.20));
        let net = Money::new(dec!(120)).divide(vat.multiplier()).unwrap();
        assert_eq!(net.amount(), dec!(100));
    }
}
