use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Club member who buys at the till.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub status_id: Option<Uuid>, // membership status, gates pay types
    pub balance: Decimal,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Membership status ("member", "guest", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Status {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Mari".into(),
            last_name: "Tamm".into(),
            status_id: None,
            balance: Decimal::ZERO,
        };
        assert_eq!(user.full_name(), "Mari Tamm");

        let nameless = User {
            last_name: String::new(),
            ..user
        };
        assert_eq!(nameless.full_name(), "Mari");
    }
}
