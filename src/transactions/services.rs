use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::paytypes::repo::PaytypeRepo;
use crate::products::repo::ProductRepo;
use crate::transactions::dto::{
    PayRequest, PaymentResponse, PopularProduct, ProductRef, TransactionView, UserStats,
};
use crate::transactions::repo::TransactionRepo;
use crate::transactions::repo_types::{Transaction, TransactionFilter, TransactionLine};
use crate::users::repo::UserRepo;

/// Largest quantity a single sale line may carry.
pub const MAX_LINE_QUANTITY: i32 = 9999;

/// Σ price × quantity over the lines.
pub fn transaction_sum(tx: &Transaction) -> Decimal {
    tx.products.iter().map(TransactionLine::line_sum).sum()
}

/// Joins transactions with users and runs the payment and void workflows.
#[derive(Clone)]
pub struct TransactionService {
    transactions: Arc<dyn TransactionRepo>,
    users: Arc<dyn UserRepo>,
    products: Arc<dyn ProductRepo>,
    paytypes: Arc<dyn PaytypeRepo>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionRepo>,
        users: Arc<dyn UserRepo>,
        products: Arc<dyn ProductRepo>,
        paytypes: Arc<dyn PaytypeRepo>,
    ) -> Self {
        Self {
            transactions,
            users,
            products,
            paytypes,
        }
    }

    pub async fn get_all(&self) -> Result<Vec<TransactionView>, AppError> {
        self.get_with_filter(&TransactionFilter::default()).await
    }

    pub async fn get_with_filter(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionView>, AppError> {
        let txs = self.transactions.find(filter).await?;
        Ok(self.decorate(txs).await)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TransactionView>, AppError> {
        let Some(tx) = self.transactions.get(id).await? else {
            return Ok(None);
        };
        Ok(self.decorate(vec![tx]).await.pop())
    }

    /// Whether any transaction matches the filter.
    pub async fn exists(&self, filter: TransactionFilter) -> Result<bool, AppError> {
        let first = TransactionFilter { limit: Some(1), ..filter };
        Ok(!self.transactions.find(&first).await?.is_empty())
    }

    pub async fn save(&self, tx: &Transaction) -> Result<(Decimal, Uuid), AppError> {
        self.transactions.save(tx).await?;
        Ok((transaction_sum(tx), tx.id))
    }

    pub async fn remove(&self) -> Result<u64, AppError> {
        info!("removing all transactions");
        Ok(self.transactions.remove_all().await?)
    }

    async fn decorate(&self, txs: Vec<Transaction>) -> Vec<TransactionView> {
        let user_ids: HashSet<Uuid> = txs.iter().map(|tx| tx.user).collect();
        let mut names = HashMap::with_capacity(user_ids.len());
        for id in user_ids {
            match self.users.get(id).await {
                Ok(Some(user)) => {
                    names.insert(id, user.full_name());
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, user_id = %id, "user lookup failed; keeping raw reference"),
            }
        }

        txs.into_iter()
            .map(|tx| {
                let user = names
                    .get(&tx.user)
                    .cloned()
                    .unwrap_or_else(|| tx.user.to_string());
                let sum = transaction_sum(&tx);
                TransactionView::new(tx, user, sum)
            })
            .collect()
    }

    /// Voids a valid transaction and reverses its effects: credits the user
    /// when the pay type affects balance and restocks every line.
    ///
    /// The flag flips before compensation, so a transaction can never be
    /// compensated twice. A failed compensation leaves it invalid and is
    /// reported with the transaction id.
    pub async fn invalidate(&self, id: Uuid) -> Result<TransactionView, AppError> {
        info!(transaction_id = %id, "marking transaction invalid");

        let Some(tx) = self.transactions.mark_invalid(id).await? else {
            return match self.transactions.get(id).await? {
                Some(_) => {
                    warn!(transaction_id = %id, "transaction already invalid");
                    Err(AppError::AlreadyInvalid(id))
                }
                None => Err(AppError::NotFound("transaction")),
            };
        };

        let sum = transaction_sum(&tx);
        let compensations = tokio::try_join!(
            async { self.credit(&tx, sum).await.context("credit user balance") },
            async { self.restock(&tx).await.context("restock products") },
        );
        if let Err(e) = compensations {
            error!(transaction_id = %id, error = %format!("{e:#}"), "compensation failed; transaction is invalid but not fully compensated");
            return Err(AppError::Store(e));
        }

        info!(transaction_id = %id, %sum, "transaction invalidated");
        self.decorate(vec![tx])
            .await
            .pop()
            .ok_or(AppError::NotFound("transaction"))
    }

    /// Records a sale. Prices come from the product records, not the client.
    pub async fn pay(&self, req: PayRequest) -> Result<PaymentResponse, AppError> {
        if req.products.is_empty() {
            return Err(AppError::Validation("select at least one product".into()));
        }
        if let Some(line) = req
            .products
            .iter()
            .find(|l| !(1..=MAX_LINE_QUANTITY).contains(&l.quantity))
        {
            return Err(AppError::Validation(format!(
                "quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
                line.product
            )));
        }

        let user = self
            .users
            .get(req.user)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        let paytype = self
            .paytypes
            .get(req.paytype)
            .await?
            .ok_or(AppError::NotFound("paytype"))?;
        if !paytype.is_allowed(user.status_id) {
            warn!(user_id = %user.id, paytype = %paytype.name, "pay type not allowed for user status");
            return Err(AppError::NotAllowed(format!(
                "pay type {} is not allowed for {}",
                paytype.name,
                user.full_name()
            )));
        }

        let mut lines = Vec::with_capacity(req.products.len());
        for line in &req.products {
            let product = self
                .products
                .get(line.product)
                .await?
                .ok_or(AppError::NotFound("product"))?;
            lines.push(TransactionLine {
                product: product.id,
                name: product.name,
                price: product.price,
                quantity: line.quantity,
            });
        }

        let tx = Transaction {
            id: Uuid::new_v4(),
            user: user.id,
            products: lines,
            paytype: paytype.id,
            time: OffsetDateTime::now_utc(),
            invalid: false,
        };
        let sum = transaction_sum(&tx);
        let charge = paytype.affects_balance.then_some(sum);
        self.transactions
            .record_sale(&tx, charge)
            .await
            .with_context(|| format!("record sale {}", tx.id))?;

        info!(transaction_id = %tx.id, user_id = %user.id, %sum, paytype = %paytype.name, "payment recorded");
        Ok(PaymentResponse { id: tx.id, sum })
    }

    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserStats, AppError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        let txs = self
            .transactions
            .find(&TransactionFilter::for_user(user_id))
            .await?;

        let mut counts: HashMap<Uuid, PopularProduct> = HashMap::new();
        for line in txs.iter().flat_map(|tx| tx.products.iter()) {
            counts
                .entry(line.product)
                .or_insert_with(|| PopularProduct {
                    product: ProductRef {
                        id: line.product,
                        name: line.name.clone(),
                    },
                    count: 0,
                })
                .count += i64::from(line.quantity);
        }
        let mut popular_products: Vec<PopularProduct> = counts.into_values().collect();
        popular_products.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.product.name.cmp(&b.product.name))
        });

        Ok(UserStats {
            user_id,
            full_name: user.full_name(),
            balance: user.balance,
            transaction_count: txs.len(),
            total: txs.iter().map(transaction_sum).sum(),
            popular_products,
        })
    }

    async fn credit(&self, tx: &Transaction, amount: Decimal) -> anyhow::Result<()> {
        let paytype = self
            .paytypes
            .get(tx.paytype)
            .await?
            .with_context(|| format!("paytype {} not found", tx.paytype))?;
        if !paytype.affects_balance {
            return Ok(());
        }
        debug!(user_id = %tx.user, %amount, "crediting user balance");
        self.users.increment_balance(tx.user, amount).await
    }

    async fn restock(&self, tx: &Transaction) -> anyhow::Result<()> {
        debug!(transaction_id = %tx.id, "putting products back on the shelf");
        for line in &tx.products {
            self.products
                .increment_quantity(line.product, line.quantity)
                .await
                .with_context(|| format!("product {}", line.product))?;
        }
        Ok(())
    }
}
