use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use crate::db::PgStore;
use crate::transactions::repo_types::{Transaction, TransactionFilter, TransactionRow};

#[async_trait]
pub trait TransactionRepo: Send + Sync {
    /// Matching transactions, newest first.
    async fn find(&self, filter: &TransactionFilter) -> anyhow::Result<Vec<Transaction>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Transaction>>;
    /// Insert, or replace the transaction with the same id.
    async fn save(&self, tx: &Transaction) -> anyhow::Result<()>;
    /// Stores a new sale with its effects: the user is debited `charge` when
    /// given and every line is taken from stock. All of it or nothing.
    async fn record_sale(&self, tx: &Transaction, charge: Option<Decimal>) -> anyhow::Result<()>;
    /// Flips a valid transaction to invalid in one step and returns it.
    /// `None` when the id is unknown or the transaction is already invalid.
    async fn mark_invalid(&self, id: Uuid) -> anyhow::Result<Option<Transaction>>;
    async fn remove_all(&self) -> anyhow::Result<u64>;
}

#[async_trait]
impl TransactionRepo for PgStore {
    async fn find(&self, filter: &TransactionFilter) -> anyhow::Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, user_id, paytype_id, products, time, invalid
            FROM transactions
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR paytype_id = $2)
              AND ($3::uuid IS NULL
                   OR products @> jsonb_build_array(jsonb_build_object('product', $3::uuid)))
              AND ($4::bool IS NULL OR invalid = $4)
            ORDER BY time DESC
            LIMIT $5
            "#,
        )
        .bind(filter.user)
        .bind(filter.paytype)
        .bind(filter.product)
        .bind(filter.invalid)
        .bind(filter.limit)
        .fetch_all(&self.db)
        .await
        .context("find transactions")?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, user_id, paytype_id, products, time, invalid
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get transaction")?;
        Ok(row.map(Transaction::from))
    }

    async fn save(&self, tx: &Transaction) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, paytype_id, products, time, invalid)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                paytype_id = EXCLUDED.paytype_id,
                products = EXCLUDED.products,
                time = EXCLUDED.time,
                invalid = EXCLUDED.invalid
            "#,
        )
        .bind(tx.id)
        .bind(tx.user)
        .bind(tx.paytype)
        .bind(Json(tx.products.clone()))
        .bind(tx.time)
        .bind(tx.invalid)
        .execute(&self.db)
        .await
        .context("save transaction")?;
        Ok(())
    }

    async fn record_sale(&self, tx: &Transaction, charge: Option<Decimal>) -> anyhow::Result<()> {
        let mut db_tx = self.db.begin().await.context("begin sale")?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, paytype_id, products, time, invalid)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tx.id)
        .bind(tx.user)
        .bind(tx.paytype)
        .bind(Json(tx.products.clone()))
        .bind(tx.time)
        .bind(tx.invalid)
        .execute(&mut *db_tx)
        .await
        .context("insert transaction")?;

        if let Some(amount) = charge {
            let res = sqlx::query(r#"UPDATE users SET balance = balance - $2 WHERE id = $1"#)
                .bind(tx.user)
                .bind(amount)
                .execute(&mut *db_tx)
                .await
                .context("debit user balance")?;
            if res.rows_affected() == 0 {
                anyhow::bail!("user {} not found", tx.user);
            }
        }

        for line in &tx.products {
            let res = sqlx::query(r#"UPDATE products SET quantity = quantity - $2 WHERE id = $1"#)
                .bind(line.product)
                .bind(line.quantity)
                .execute(&mut *db_tx)
                .await
                .with_context(|| format!("take product {} from stock", line.product))?;
            if res.rows_affected() == 0 {
                anyhow::bail!("product {} not found", line.product);
            }
        }

        db_tx.commit().await.context("commit sale")?;
        Ok(())
    }

    async fn mark_invalid(&self, id: Uuid) -> anyhow::Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET invalid = TRUE
            WHERE id = $1 AND invalid = FALSE
            RETURNING id, user_id, paytype_id, products, time, invalid
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("mark transaction invalid")?;
        Ok(row.map(Transaction::from))
    }

    async fn remove_all(&self) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"DELETE FROM transactions"#)
            .execute(&self.db)
            .await
            .context("remove transactions")?;
        Ok(res.rows_affected())
    }
}
