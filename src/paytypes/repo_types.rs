use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment method offered at the till.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Paytype {
    pub id: Uuid,
    pub name: String,
    /// Paying with this type debits the user's balance ("on account").
    pub affects_balance: bool,
    pub allowed_statuses: Vec<Uuid>,
}

impl Paytype {
    /// Users without a status may not use any pay type.
    pub fn is_allowed(&self, status: Option<Uuid>) -> bool {
        status.is_some_and(|s| self.allowed_statuses.contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_only_for_listed_statuses() {
        let member = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let paytype = Paytype {
            id: Uuid::new_v4(),
            name: "Account".into(),
            affects_balance: true,
            allowed_statuses: vec![member],
        };
        assert!(paytype.is_allowed(Some(member)));
        assert!(!paytype.is_allowed(Some(guest)));
        assert!(!paytype.is_allowed(None));
    }
}
