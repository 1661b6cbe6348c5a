use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary value to two decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(dec!(10.005)), dec!(10.01));
        assert_eq!(round2(dec!(10.004)), dec!(10.00));
        assert_eq!(round2(dec!(-10.005)), dec!(-10.01));
    }
}
