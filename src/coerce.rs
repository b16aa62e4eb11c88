//! Lenient numeric deserializers.
//!
//! POS clients send line prices and quantities either as JSON numbers or as
//! strings ("10", " 2 "). Both forms are accepted.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s.trim().to_string(),
    };
    parse_decimal(&raw).ok_or_else(|| de::Error::custom(format!("invalid amount {raw:?}")))
}

pub fn int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid quantity {n}"))),
        NumberOrString::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| de::Error::custom(format!("invalid quantity {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Line {
        #[serde(deserialize_with = "decimal")]
        price: Decimal,
        #[serde(deserialize_with = "int")]
        quantity: i32,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let a: Line = serde_json::from_str(r#"{"price":"10","quantity":2}"#).unwrap();
        assert_eq!(a.price, dec!(10));
        assert_eq!(a.quantity, 2);

        let b: Line = serde_json::from_str(r#"{"price":2.5,"quantity":" 3 "}"#).unwrap();
        assert_eq!(b.price, dec!(2.5));
        assert_eq!(b.quantity, 3);

        let c: Line = serde_json::from_str(r#"{"price":1,"quantity":4.0}"#).unwrap();
        assert_eq!(c.quantity, 4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Line>(r#"{"price":"ten","quantity":1}"#).is_err());
        assert!(serde_json::from_str::<Line>(r#"{"price":"1","quantity":1.5}"#).is_err());
        assert!(serde_json::from_str::<Line>(r#"{"price":"1","quantity":"x"}"#).is_err());
    }
}
