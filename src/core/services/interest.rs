//! Pure interest arithmetic; no store access and no side effects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::round2;
use crate::errors::{CoreError, CoreResult};

/// Period the interest rate is expressed over. Daily and annual rates
/// prorate over a 365-day year; monthly rates over a 30-day month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingPeriod {
    Daily,
    Monthly,
    Annually,
}

impl CompoundingPeriod {
    fn period_divisor(self) -> Decimal {
        match self {
            CompoundingPeriod::Daily | CompoundingPeriod::Annually => Decimal::from(365),
            CompoundingPeriod::Monthly => Decimal::from(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestBreakdown {
    pub interest: Decimal,
    pub total: Decimal,
}

/// `interest = principal × (rate / 100) × (days / divisor)`, rounded to
/// two decimals; `total = principal + interest`.
pub fn calculate_interest(
    principal: Decimal,
    rate_percent: Decimal,
    days: i64,
    period: CompoundingPeriod,
) -> CoreResult<InterestBreakdown> {
    if principal < Decimal::ZERO {
        return Err(CoreError::Validation("principal must not be negative".into()));
    }
    if rate_percent < Decimal::ZERO {
        return Err(CoreError::Validation("interest rate must not be negative".into()));
    }
    if days < 0 {
        return Err(CoreError::Validation("day count must not be negative".into()));
    }
    let rate = rate_percent / Decimal::from(100);
    let elapsed = Decimal::from(days) / period.period_divisor();
    let interest = round2(principal * rate * elapsed);
    Ok(InterestBreakdown {
        interest,
        total: principal + interest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn one_year_of_daily_interest() {
        let result = calculate_interest(dec!(1000), dec!(12), 365, CompoundingPeriod::Daily).unwrap();
        assert_eq!(result.interest, dec!(120.00));
        assert_eq!(result.total, dec!(1120.00));
    }

    #[test]
    fn monthly_rate_prorates_over_thirty_days() {
        let result = calculate_interest(dec!(1000), dec!(6), 15, CompoundingPeriod::Monthly).unwrap();
        assert_eq!(result.interest, dec!(30.00));
        assert_eq!(result.total, dec!(1030.00));
    }

    #[test]
    fn zero_days_yields_zero_interest() {
        let result = calculate_interest(dec!(1000), dec!(12), 0, CompoundingPeriod::Annually).unwrap();
        assert_eq!(result.interest, Decimal::ZERO);
        assert_eq!(result.total, dec!(1000));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(calculate_interest(dec!(-1), dec!(12), 10, CompoundingPeriod::Daily).is_err());
        assert!(calculate_interest(dec!(100), dec!(-1), 10, CompoundingPeriod::Daily).is_err());
        assert!(calculate_interest(dec!(100), dec!(12), -10, CompoundingPeriod::Daily).is_err());
    }
}
