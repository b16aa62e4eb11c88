use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::coerce;

/// One sold product inside a transaction. Price is captured at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub product: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "coerce::decimal")]
    pub price: Decimal,
    #[serde(deserialize_with = "coerce::int")]
    pub quantity: i32,
}

impl TransactionLine {
    pub fn line_sum(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user: Uuid,
    pub products: Vec<TransactionLine>,
    pub paytype: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde(default)]
    pub invalid: bool,
}

/// Row shape of the `transactions` table; lines live in a JSONB column.
#[derive(Debug, FromRow)]
pub(crate) struct TransactionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub paytype_id: Uuid,
    pub products: Json<Vec<TransactionLine>>,
    pub time: OffsetDateTime,
    pub invalid: bool,
}

impl From<TransactionRow> for Transaction {
    fn from(r: TransactionRow) -> Self {
        Self {
            id: r.id,
            user: r.user_id,
            products: r.products.0,
            paytype: r.paytype_id,
            time: r.time,
            invalid: r.invalid,
        }
    }
}

/// Filter for transaction listings. The default matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub user: Option<Uuid>,
    pub paytype: Option<Uuid>,
    /// Transactions with at least one line of this product.
    pub product: Option<Uuid>,
    pub invalid: Option<bool>,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    pub fn for_user(user: Uuid) -> Self {
        Self {
            user: Some(user),
            invalid: Some(false),
            ..Default::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.user.map_or(true, |u| tx.user == u)
            && self.paytype.map_or(true, |p| tx.paytype == p)
            && self
                .product
                .map_or(true, |p| tx.products.iter().any(|l| l.product == p))
            && self.invalid.map_or(true, |i| tx.invalid == i)
    }
}
