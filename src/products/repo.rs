use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::db::PgStore;
use crate::products::repo_types::Product;

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Product>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    /// Adds `delta` (may be negative) to the on-hand quantity. Unknown product is an error.
    async fn increment_quantity(&self, id: Uuid, delta: i32) -> anyhow::Result<()>;
    async fn create(&self, product: &Product) -> anyhow::Result<()>;
    async fn update(&self, product: &Product) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl ProductRepo for PgStore {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"SELECT id, name, price, quantity FROM products ORDER BY name"#,
        )
        .fetch_all(&self.db)
        .await
        .context("list products")?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT id, name, price, quantity FROM products WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get product")?;
        Ok(product)
    }

    async fn increment_quantity(&self, id: Uuid, delta: i32) -> anyhow::Result<()> {
        let res = sqlx::query(r#"UPDATE products SET quantity = quantity + $2 WHERE id = $1"#)
            .bind(id)
            .bind(delta)
            .execute(&self.db)
            .await
            .context("increment product quantity")?;
        if res.rows_affected() == 0 {
            anyhow::bail!("product {id} not found");
        }
        Ok(())
    }

    async fn create(&self, product: &Product) -> anyhow::Result<()> {
        sqlx::query(r#"INSERT INTO products (id, name, price, quantity) VALUES ($1, $2, $3, $4)"#)
            .bind(product.id)
            .bind(&product.name)
            .bind(product.price)
            .bind(product.quantity)
            .execute(&self.db)
            .await
            .context("create product")?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE products SET name = $2, price = $3, quantity = $4 WHERE id = $1"#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .execute(&self.db)
        .await
        .context("update product")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() > 0)
    }
}
