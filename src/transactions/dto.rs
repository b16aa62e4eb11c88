use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::coerce;
use crate::transactions::repo_types::{Transaction, TransactionLine};

/// Transaction as shown at the till: with its sum and the owner's display name.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: Uuid,
    pub user: String, // full name, or the raw user id when the lookup fails
    pub user_id: Uuid,
    pub products: Vec<TransactionLine>,
    pub paytype: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub invalid: bool,
    pub sum: Decimal,
}

impl TransactionView {
    pub fn new(tx: Transaction, user: String, sum: Decimal) -> Self {
        Self {
            id: tx.id,
            user,
            user_id: tx.user,
            products: tx.products,
            paytype: tx.paytype,
            time: tx.time,
            invalid: tx.invalid,
            sum,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PayLine {
    pub product: Uuid,
    #[serde(deserialize_with = "coerce::int")]
    pub quantity: i32,
}

/// POST /transactions
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub user: Uuid,
    pub paytype: Uuid,
    pub products: Vec<PayLine>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub sum: Decimal,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularProduct {
    pub product: ProductRef,
    pub count: i64, // units bought
}

/// Purchase history summary behind the user info dialog.
#[derive(Debug, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub full_name: String,
    pub balance: Decimal,
    pub transaction_count: usize,
    pub total: Decimal,
    pub popular_products: Vec<PopularProduct>,
}
