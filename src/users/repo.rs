use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::PgStore;
use crate::users::repo_types::{Status, User};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Adds `amount` (may be negative) to the balance. Unknown user is an error.
    async fn increment_balance(&self, id: Uuid, amount: Decimal) -> anyhow::Result<()>;
    async fn create(&self, user: &User) -> anyhow::Result<()>;
    /// Replaces name and status. The balance only moves through sales, voids and deposits.
    async fn update(&self, user: &User) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn list_statuses(&self) -> anyhow::Result<Vec<Status>>;
    async fn create_status(&self, status: &Status) -> anyhow::Result<()>;
    async fn update_status(&self, status: &Status) -> anyhow::Result<bool>;
    /// Also detaches the status from users and pay types.
    async fn delete_status(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, status_id, balance
            FROM users
            ORDER BY first_name, last_name
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, status_id, balance
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get user")?;
        Ok(user)
    }

    async fn increment_balance(&self, id: Uuid, amount: Decimal) -> anyhow::Result<()> {
        let res = sqlx::query(r#"UPDATE users SET balance = balance + $2 WHERE id = $1"#)
            .bind(id)
            .bind(amount)
            .execute(&self.db)
            .await
            .context("increment user balance")?;
        if res.rows_affected() == 0 {
            anyhow::bail!("user {id} not found");
        }
        Ok(())
    }

    async fn list_statuses(&self) -> anyhow::Result<Vec<Status>> {
        let rows = sqlx::query_as::<_, Status>(r#"SELECT id, name FROM statuses ORDER BY name"#)
            .fetch_all(&self.db)
            .await
            .context("list statuses")?;
        Ok(rows)
    }

    async fn create(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, status_id, balance)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.status_id)
        .bind(user.balance)
        .execute(&self.db)
        .await
        .context("create user")?;
        Ok(())
    }

    async fn update(&self, user: &User) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, status_id = $4
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.status_id)
        .execute(&self.db)
        .await
        .context("update user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_status(&self, status: &Status) -> anyhow::Result<()> {
        sqlx::query(r#"INSERT INTO statuses (id, name) VALUES ($1, $2)"#)
            .bind(status.id)
            .bind(&status.name)
            .execute(&self.db)
            .await
            .context("create status")?;
        Ok(())
    }

    async fn update_status(&self, status: &Status) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE statuses SET name = $2 WHERE id = $1"#)
            .bind(status.id)
            .bind(&status.name)
            .execute(&self.db)
            .await
            .context("update status")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_status(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(r#"UPDATE paytypes SET allowed_statuses = array_remove(allowed_statuses, $1)"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("detach status from paytypes")?;
        // users.status_id is cleared by ON DELETE SET NULL
        let res = sqlx::query(r#"DELETE FROM statuses WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete status")?;
        tx.commit().await.context("commit tx")?;
        Ok(res.rows_affected() > 0)
    }
}
