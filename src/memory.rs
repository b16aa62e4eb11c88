use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::AccountRepo;
use crate::auth::repo_types::{Account, Role};
use crate::feedback::repo::{Feedback, FeedbackRepo};
use crate::paytypes::{repo::PaytypeRepo, repo_types::Paytype};
use crate::products::{repo::ProductRepo, repo_types::Product};
use crate::transactions::{
    repo::TransactionRepo,
    repo_types::{Transaction, TransactionFilter},
};
use crate::users::{
    repo::UserRepo,
    repo_types::{Status, User},
};

/// In-process store for tests and `STORE_BACKEND=memory` runs.
///
/// Every collection sits behind its own lock; no lock is held across an await.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    statuses: RwLock<Vec<Status>>,
    products: RwLock<HashMap<Uuid, Product>>,
    paytypes: RwLock<HashMap<Uuid, Paytype>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    feedback: RwLock<Vec<Feedback>>,
    accounts: RwLock<HashMap<Uuid, Account>>,
}

fn read<T>(lock: &RwLock<T>) -> anyhow::Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow::anyhow!("lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> anyhow::Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow::anyhow!("lock poisoned"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_status(&self, status: Status) -> anyhow::Result<()> {
        write(&self.statuses)?.push(status);
        Ok(())
    }

    pub fn insert_user(&self, user: User) -> anyhow::Result<()> {
        write(&self.users)?.insert(user.id, user);
        Ok(())
    }

    pub fn insert_product(&self, product: Product) -> anyhow::Result<()> {
        write(&self.products)?.insert(product.id, product);
        Ok(())
    }

    pub fn insert_paytype(&self, paytype: Paytype) -> anyhow::Result<()> {
        write(&self.paytypes)?.insert(paytype.id, paytype);
        Ok(())
    }

    #[cfg(test)]
    pub fn feedback_count(&self) -> anyhow::Result<usize> {
        Ok(read(&self.feedback)?.len())
    }

    /// A small till: two statuses, three members, a few products and pay types.
    pub fn demo() -> anyhow::Result<Self> {
        let store = Self::new();

        let member = Status { id: Uuid::new_v4(), name: "member".into() };
        let guest = Status { id: Uuid::new_v4(), name: "guest".into() };
        store.insert_status(member.clone())?;
        store.insert_status(guest.clone())?;

        for (first, last, status) in [
            ("Mari", "Tamm", &member),
            ("Jaan", "Kask", &member),
            ("Liis", "Saar", &guest),
        ] {
            store.insert_user(User {
                id: Uuid::new_v4(),
                first_name: first.into(),
                last_name: last.into(),
                status_id: Some(status.id),
                balance: Decimal::ZERO,
            })?;
        }

        for (name, cents, quantity) in [("Coffee", 150, 40), ("Sandwich", 320, 12), ("Juice", 200, 0)] {
            store.insert_product(Product {
                id: Uuid::new_v4(),
                name: name.into(),
                price: Decimal::new(cents, 2),
                quantity,
            })?;
        }

        store.insert_paytype(Paytype {
            id: Uuid::new_v4(),
            name: "Account".into(),
            affects_balance: true,
            allowed_statuses: vec![member.id],
        })?;
        store.insert_paytype(Paytype {
            id: Uuid::new_v4(),
            name: "Cash".into(),
            affects_balance: false,
            allowed_statuses: vec![member.id, guest.id],
        })?;

        Ok(store)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = read(&self.users)?.values().cloned().collect();
        users.sort_by(|a, b| (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name)));
        Ok(users)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn increment_balance(&self, id: Uuid, amount: Decimal) -> anyhow::Result<()> {
        let mut users = write(&self.users)?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.balance = user
            .balance
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("balance of user {id} out of range"))?;
        Ok(())
    }

    async fn create(&self, user: &User) -> anyhow::Result<()> {
        let mut users = write(&self.users)?;
        if users.contains_key(&user.id) {
            anyhow::bail!("user {} already exists", user.id);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> anyhow::Result<bool> {
        let mut users = write(&self.users)?;
        let Some(stored) = users.get_mut(&user.id) else {
            return Ok(false);
        };
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.status_id = user.status_id;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(write(&self.users)?.remove(&id).is_some())
    }

    async fn list_statuses(&self) -> anyhow::Result<Vec<Status>> {
        let mut statuses = read(&self.statuses)?.clone();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(statuses)
    }

    async fn create_status(&self, status: &Status) -> anyhow::Result<()> {
        let mut statuses = write(&self.statuses)?;
        if statuses.iter().any(|s| s.id == status.id || s.name == status.name) {
            anyhow::bail!("status {} already exists", status.name);
        }
        statuses.push(status.clone());
        Ok(())
    }

    async fn update_status(&self, status: &Status) -> anyhow::Result<bool> {
        let mut statuses = write(&self.statuses)?;
        match statuses.iter_mut().find(|s| s.id == status.id) {
            Some(stored) => {
                stored.name = status.name.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_status(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut statuses = write(&self.statuses)?;
        let mut users = write(&self.users)?;
        let mut paytypes = write(&self.paytypes)?;

        let before = statuses.len();
        statuses.retain(|s| s.id != id);
        if statuses.len() == before {
            return Ok(false);
        }
        for user in users.values_mut().filter(|u| u.status_id == Some(id)) {
            user.status_id = None;
        }
        for paytype in paytypes.values_mut() {
            paytype.allowed_statuses.retain(|s| *s != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let mut products: Vec<Product> = read(&self.products)?.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(read(&self.products)?.get(&id).cloned())
    }

    async fn increment_quantity(&self, id: Uuid, delta: i32) -> anyhow::Result<()> {
        let mut products = write(&self.products)?;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("product {id} not found"))?;
        product.quantity = product
            .quantity
            .checked_add(delta)
            .ok_or_else(|| anyhow::anyhow!("stock of product {id} out of range"))?;
        Ok(())
    }

    async fn create(&self, product: &Product) -> anyhow::Result<()> {
        let mut products = write(&self.products)?;
        if products.contains_key(&product.id) {
            anyhow::bail!("product {} already exists", product.id);
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> anyhow::Result<bool> {
        let mut products = write(&self.products)?;
        match products.get_mut(&product.id) {
            Some(stored) => {
                *stored = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(write(&self.products)?.remove(&id).is_some())
    }
}

#[async_trait]
impl PaytypeRepo for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Paytype>> {
        let mut paytypes: Vec<Paytype> = read(&self.paytypes)?.values().cloned().collect();
        paytypes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paytypes)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Paytype>> {
        Ok(read(&self.paytypes)?.get(&id).cloned())
    }

    async fn create(&self, paytype: &Paytype) -> anyhow::Result<()> {
        let mut paytypes = write(&self.paytypes)?;
        if paytypes.contains_key(&paytype.id) {
            anyhow::bail!("paytype {} already exists", paytype.id);
        }
        paytypes.insert(paytype.id, paytype.clone());
        Ok(())
    }

    async fn update(&self, paytype: &Paytype) -> anyhow::Result<bool> {
        let mut paytypes = write(&self.paytypes)?;
        match paytypes.get_mut(&paytype.id) {
            Some(stored) => {
                *stored = paytype.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(write(&self.paytypes)?.remove(&id).is_some())
    }
}

#[async_trait]
impl TransactionRepo for MemoryStore {
    async fn find(&self, filter: &TransactionFilter) -> anyhow::Result<Vec<Transaction>> {
        let mut found: Vec<Transaction> = read(&self.transactions)?
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.time.cmp(&a.time));
        if let Some(limit) = filter.limit {
            found.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(found)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Transaction>> {
        Ok(read(&self.transactions)?.get(&id).cloned())
    }

    async fn save(&self, tx: &Transaction) -> anyhow::Result<()> {
        write(&self.transactions)?.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn record_sale(&self, tx: &Transaction, charge: Option<Decimal>) -> anyhow::Result<()> {
        let mut transactions = write(&self.transactions)?;
        let mut users = write(&self.users)?;
        let mut products = write(&self.products)?;

        // work out every new value before touching anything
        let balance = match charge {
            Some(amount) => {
                let user = users
                    .get(&tx.user)
                    .ok_or_else(|| anyhow::anyhow!("user {} not found", tx.user))?;
                let next = user
                    .balance
                    .checked_sub(amount)
                    .ok_or_else(|| anyhow::anyhow!("balance of user {} out of range", tx.user))?;
                Some(next)
            }
            None => None,
        };
        let mut stock: HashMap<Uuid, i32> = HashMap::new();
        for line in &tx.products {
            let current = match stock.get(&line.product) {
                Some(q) => *q,
                None => {
                    products
                        .get(&line.product)
                        .ok_or_else(|| anyhow::anyhow!("product {} not found", line.product))?
                        .quantity
                }
            };
            let next = current
                .checked_sub(line.quantity)
                .ok_or_else(|| anyhow::anyhow!("stock of product {} out of range", line.product))?;
            stock.insert(line.product, next);
        }

        if let (Some(balance), Some(user)) = (balance, users.get_mut(&tx.user)) {
            user.balance = balance;
        }
        for (id, quantity) in stock {
            if let Some(product) = products.get_mut(&id) {
                product.quantity = quantity;
            }
        }
        transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn mark_invalid(&self, id: Uuid) -> anyhow::Result<Option<Transaction>> {
        let mut transactions = write(&self.transactions)?;
        match transactions.get_mut(&id) {
            Some(tx) if !tx.invalid => {
                tx.invalid = true;
                Ok(Some(tx.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_all(&self) -> anyhow::Result<u64> {
        let mut transactions = write(&self.transactions)?;
        let removed = transactions.len() as u64;
        transactions.clear();
        Ok(removed)
    }
}

#[async_trait]
impl FeedbackRepo for MemoryStore {
    async fn create(&self, content: &str) -> anyhow::Result<Feedback> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        write(&self.feedback)?.push(feedback.clone());
        Ok(feedback)
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        Ok(read(&self.accounts)?
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(read(&self.accounts)?.get(&id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str, role: Role) -> anyhow::Result<Account> {
        let mut accounts = write(&self.accounts)?;
        if accounts.values().any(|a| a.email == email) {
            anyhow::bail!("account {email} already exists");
        }
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }
}
