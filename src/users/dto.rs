use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coerce;
use crate::error::AppError;
use crate::users::repo_types::{Status, User};

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub status: Option<Status>,
    pub balance: Decimal,
}

impl UserResponse {
    pub fn new(user: User, statuses: &HashMap<Uuid, Status>) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name(),
            status: user.status_id.and_then(|s| statuses.get(&s).cloned()),
            first_name: user.first_name,
            last_name: user.last_name,
            balance: user.balance,
        }
    }
}

pub fn status_index(statuses: Vec<Status>) -> HashMap<Uuid, Status> {
    statuses.into_iter().map(|s| (s.id, s)).collect()
}

/// Body of POST /users and PUT /users/:id.
#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub status: Option<Uuid>,
}

impl UserInput {
    pub fn into_user(self, id: Uuid, balance: Decimal) -> Result<User, AppError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(AppError::Validation("first name must not be empty".into()));
        }
        Ok(User {
            id,
            first_name: first_name.to_string(),
            last_name: self.last_name.trim().to_string(),
            status_id: self.status,
            balance,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub name: String,
}

impl StatusInput {
    pub fn into_status(self, id: Uuid) -> Result<Status, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("status name must not be empty".into()));
        }
        Ok(Status { id, name: name.to_string() })
    }
}

/// POST /users/:id/deposit. Negative amounts correct a balance downwards.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    #[serde(deserialize_with = "coerce::decimal")]
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_is_trimmed_and_needs_a_first_name() {
        let input = UserInput {
            first_name: "  Mari ".into(),
            last_name: " Tamm".into(),
            status: None,
        };
        let user = input.into_user(Uuid::new_v4(), Decimal::ZERO).unwrap();
        assert_eq!(user.full_name(), "Mari Tamm");

        let blank = UserInput { first_name: " ".into(), last_name: "Tamm".into(), status: None };
        assert!(matches!(
            blank.into_user(Uuid::new_v4(), Decimal::ZERO),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn deposit_accepts_string_amounts() {
        let deposit: DepositRequest = serde_json::from_str(r#"{"amount": "12.50"}"#).unwrap();
        assert_eq!(deposit.amount, Decimal::new(1250, 2));
    }
}
