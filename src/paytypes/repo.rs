use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::db::PgStore;
use crate::paytypes::repo_types::Paytype;

#[async_trait]
pub trait PaytypeRepo: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Paytype>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Paytype>>;
    async fn create(&self, paytype: &Paytype) -> anyhow::Result<()>;
    async fn update(&self, paytype: &Paytype) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl PaytypeRepo for PgStore {
    async fn list(&self) -> anyhow::Result<Vec<Paytype>> {
        let rows = sqlx::query_as::<_, Paytype>(
            r#"SELECT id, name, affects_balance, allowed_statuses FROM paytypes ORDER BY name"#,
        )
        .fetch_all(&self.db)
        .await
        .context("list paytypes")?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Paytype>> {
        let paytype = sqlx::query_as::<_, Paytype>(
            r#"SELECT id, name, affects_balance, allowed_statuses FROM paytypes WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get paytype")?;
        Ok(paytype)
    }

    async fn create(&self, paytype: &Paytype) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO paytypes (id, name, affects_balance, allowed_statuses)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(paytype.id)
        .bind(&paytype.name)
        .bind(paytype.affects_balance)
        .bind(&paytype.allowed_statuses)
        .execute(&self.db)
        .await
        .context("create paytype")?;
        Ok(())
    }

    async fn update(&self, paytype: &Paytype) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE paytypes
            SET name = $2, affects_balance = $3, allowed_statuses = $4
            WHERE id = $1
            "#,
        )
        .bind(paytype.id)
        .bind(&paytype.name)
        .bind(paytype.affects_balance)
        .bind(&paytype.allowed_statuses)
        .execute(&self.db)
        .await
        .context("update paytype")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM paytypes WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete paytype")?;
        Ok(res.rows_affected() > 0)
    }
}
