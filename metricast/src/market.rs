//! Market sizing against the latest observed user count

use crate::config::ZeroDenominatorPolicy;
use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::utils::checked_ratio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Penetration of the total and serviceable addressable markets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSizing {
    pub tam: f64,
    pub sam: f64,
    /// Last value of the user series
    pub current_users: f64,
    /// Percent of TAM reached
    pub tam_penetration: f64,
    /// Percent of SAM reached
    pub sam_penetration: f64,
    /// Users in SAM not yet reached
    pub addressable_market: f64,
}

impl fmt::Display for MarketSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Market Sizing:")?;
        writeln!(f, "  TAM:                {:.0}", self.tam)?;
        writeln!(f, "  SAM:                {:.0}", self.sam)?;
        writeln!(f, "  Current users:      {:.0}", self.current_users)?;
        writeln!(f, "  TAM penetration:    {:.4}%", self.tam_penetration)?;
        writeln!(f, "  SAM penetration:    {:.4}%", self.sam_penetration)?;
        write!(f, "  Addressable market: {:.0}", self.addressable_market)
    }
}

/// Size the market reached by the last value of `users`
///
/// Market sizes must be finite and non-negative. A zero TAM or SAM follows
/// `policy`.
pub fn penetration(
    users: &Series,
    tam: f64,
    sam: f64,
    policy: ZeroDenominatorPolicy,
) -> Result<MarketSizing> {
    for (name, size) in [("TAM", tam), ("SAM", sam)] {
        if !size.is_finite() || size < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "{} must be a non-negative number, got {}",
                name, size
            )));
        }
    }
    if sam > tam {
        tracing::warn!(tam, sam, "serviceable market exceeds the total market");
    }

    let current_users = *users
        .values()
        .last()
        .ok_or_else(|| ForecastError::DataError("Empty series".to_string()))?;

    let tam_share = checked_ratio(current_users, tam, policy)
        .map_err(|_| ForecastError::DivisionByZero("TAM penetration: TAM is zero".to_string()))?;
    let sam_share = checked_ratio(current_users, sam, policy)
        .map_err(|_| ForecastError::DivisionByZero("SAM penetration: SAM is zero".to_string()))?;

    Ok(MarketSizing {
        tam,
        sam,
        current_users,
        tam_penetration: tam_share * 100.0,
        sam_penetration: sam_share * 100.0,
        addressable_market: sam - current_users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn users(values: &[f64]) -> Series {
        Series::from_values(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn test_penetration_uses_last_value() {
        let sizing = penetration(
            &users(&[40_000.0, 50_000.0]),
            10_000_000.0,
            2_000_000.0,
            ZeroDenominatorPolicy::Fail,
        )
        .unwrap();

        assert_eq!(sizing.current_users, 50_000.0);
        assert_relative_eq!(sizing.tam_penetration, 0.5, epsilon = 1e-12);
        assert_relative_eq!(sizing.sam_penetration, 2.5, epsilon = 1e-12);
        assert_eq!(sizing.addressable_market, 1_950_000.0);
    }

    #[test]
    fn test_zero_market_size() {
        let data = users(&[10.0]);
        assert!(matches!(
            penetration(&data, 0.0, 100.0, ZeroDenominatorPolicy::Fail),
            Err(ForecastError::DivisionByZero(_))
        ));

        let sizing = penetration(&data, 1000.0, 0.0, ZeroDenominatorPolicy::Sentinel).unwrap();
        assert_eq!(sizing.sam_penetration, f64::INFINITY);
        assert_eq!(sizing.addressable_market, -10.0);
    }

    #[test]
    fn test_invalid_market_size() {
        let data = users(&[10.0]);
        assert!(penetration(&data, -1.0, 100.0, ZeroDenominatorPolicy::Fail).is_err());
        assert!(penetration(&data, 100.0, f64::NAN, ZeroDenominatorPolicy::Fail).is_err());
    }

    #[test]
    fn test_display() {
        let sizing = penetration(&users(&[500.0]), 100_000.0, 10_000.0, ZeroDenominatorPolicy::Fail).unwrap();
        let text = sizing.to_string();
        assert!(text.contains("SAM penetration:    5.0000%"));
    }
}
