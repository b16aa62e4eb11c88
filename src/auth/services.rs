use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::password::hash_password;
use crate::auth::repo::AccountRepo;
use crate::auth::repo_types::{Account, Role};
use crate::config::{AdminBootstrap, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates credentials and stores a new account.
pub async fn create_account(
    accounts: &dyn AccountRepo,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Account, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }
    if accounts.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(password)?;
    let account = accounts.create(&email, &hash, role).await?;
    info!(account_id = %account.id, email = %account.email, role = role.as_str(), "account created");
    Ok(account)
}

/// Creates the configured admin account unless it already exists.
pub async fn ensure_admin(accounts: &dyn AccountRepo, admin: &AdminBootstrap) -> anyhow::Result<()> {
    let email = normalize_email(&admin.email);
    if accounts.find_by_email(&email).await?.is_some() {
        debug!(%email, "admin account present");
        return Ok(());
    }
    info!(%email, "admin account doesn't exist, creating");
    match create_account(accounts, &email, &admin.password, Role::Admin).await {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(error = %e, "admin bootstrap failed");
            Err(anyhow::anyhow!("admin bootstrap: {e}"))
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, account_id: Uuid, role: Role, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: account_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            role,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(account_id = %account_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, account_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign_with_kind(account_id, role, TokenKind::Access)
    }

    pub fn sign_refresh(&self, account_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign_with_kind(account_id, role, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(account_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("kassa@leola.ee"));
        assert!(!is_valid_email("kassa@leola"));
        assert!(!is_valid_email("not an email"));
        assert_eq!(normalize_email("  Kassa@Leola.EE "), "kassa@leola.ee");
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let id = Uuid::new_v4();
        let token = keys.sign_access(id, Role::Cashier).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.role, Role::Cashier);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4(), Role::Admin).expect("sign access");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));

        let refresh = keys.sign_refresh(Uuid::new_v4(), Role::Admin).expect("sign refresh");
        assert_eq!(keys.verify_refresh(&refresh).unwrap().kind, TokenKind::Refresh);
    }

    #[test]
    fn verify_rejects_other_audience() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4(), Role::Cashier).expect("sign access");
        let other = JwtKeys {
            audience: "someone-else".into(),
            ..make_keys()
        };
        assert!(other.verify(&token).is_err());
    }

    #[tokio::test]
    async fn create_account_validates_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let bad = create_account(&store, "nope", "long-enough", Role::Cashier).await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
        let short = create_account(&store, "a@b.ee", "short", Role::Cashier).await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let account = create_account(&store, " A@B.ee", "long-enough", Role::Cashier)
            .await
            .unwrap();
        assert_eq!(account.email, "a@b.ee");

        let dup = create_account(&store, "a@b.ee", "long-enough", Role::Cashier).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryStore::new();
        let admin = AdminBootstrap {
            email: "admin@leola.ee".into(),
            password: "admin-password".into(),
        };
        ensure_admin(&store, &admin).await.unwrap();
        ensure_admin(&store, &admin).await.unwrap();

        let account = store.find_by_email("admin@leola.ee").await.unwrap().unwrap();
        assert_eq!(account.role, Role::Admin);
    }
}
