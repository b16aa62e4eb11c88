use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::PgStore;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait FeedbackRepo: Send + Sync {
    async fn create(&self, content: &str) -> anyhow::Result<Feedback>;
}

#[async_trait]
impl FeedbackRepo for PgStore {
    async fn create(&self, content: &str) -> anyhow::Result<Feedback> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (id, content)
            VALUES ($1, $2)
            RETURNING id, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content)
        .fetch_one(&self.db)
        .await
        .context("create feedback")?;
        Ok(feedback)
    }
}
