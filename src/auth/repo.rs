use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{Account, AccountRow, Role};
use crate::db::PgStore;

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Account>>;
    async fn create(&self, email: &str, password_hash: &str, role: Role) -> anyhow::Result<Account>;
}

#[async_trait]
impl AccountRepo for PgStore {
    /// Find an account by email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")?;
        row.map(Account::try_from).transpose()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"SELECT id, email, password_hash, role, created_at FROM accounts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get account")?;
        row.map(Account::try_from).transpose()
    }

    /// Create a new account with hashed password.
    async fn create(&self, email: &str, password_hash: &str, role: Role) -> anyhow::Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await
        .context("create account")?;
        Account::try_from(row)
    }
}
