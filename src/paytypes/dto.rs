use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::paytypes::repo_types::Paytype;

/// Body of POST /paytypes and PUT /paytypes/:id.
#[derive(Debug, Deserialize)]
pub struct PaytypeInput {
    pub name: String,
    #[serde(default)]
    pub affects_balance: bool,
    #[serde(default)]
    pub allowed_statuses: Vec<Uuid>,
}

impl PaytypeInput {
    pub fn into_paytype(self, id: Uuid) -> Result<Paytype, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("pay type name must not be empty".into()));
        }
        let mut allowed_statuses = self.allowed_statuses;
        allowed_statuses.sort();
        allowed_statuses.dedup();
        Ok(Paytype {
            id,
            name: name.to_string(),
            affects_balance: self.affects_balance,
            allowed_statuses,
        })
    }
}
