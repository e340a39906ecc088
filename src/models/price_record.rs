use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw tabular row: column name -> raw cell text.
pub type RawRow = BTreeMap<String, String>;

/// Where a record's `change_percent` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    FromSource, // Verbatim from the source's change column
    Derived,    // (close - open) / open * 100
    Undefined,  // Derived form with a zero open price; percent is absent
}

impl ChangeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOrigin::FromSource => "from_source",
            ChangeOrigin::Derived => "derived",
            ChangeOrigin::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "from_source" => Ok(ChangeOrigin::FromSource),
            "derived" => Ok(ChangeOrigin::Derived),
            "undefined" => Ok(ChangeOrigin::Undefined),
            other => Err(format!("Unknown change origin: {}", other)),
        }
    }
}

// Canonical gold price for a single calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPriceRecord {
    pub date: NaiveDate,
    pub open_price: BigDecimal,
    pub high_price: BigDecimal,
    pub low_price: BigDecimal,
    pub close_price: BigDecimal,
    pub volume: Option<i64>,
    pub change_amount: BigDecimal,
    pub change_percent: Option<BigDecimal>, // None only when change_origin is Undefined
    pub change_origin: ChangeOrigin,
}

/// Query parameters for reading a slice of the price history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceRangeParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_origin_round_trips_through_text() {
        for origin in [ChangeOrigin::FromSource, ChangeOrigin::Derived, ChangeOrigin::Undefined] {
            assert_eq!(origin.as_str().parse::<ChangeOrigin>().unwrap(), origin);
        }
        assert!("verbatim".parse::<ChangeOrigin>().is_err());
    }

    #[test]
    fn test_change_origin_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeOrigin::FromSource).unwrap();
        assert_eq!(json, "\"from_source\"");
    }
}
