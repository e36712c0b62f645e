use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::error::AccountError;
use super::password::{digest_password, digests_match, validate_password};
use super::repo::AccountRepository;
use super::repo_types::{
    password_expiry_for, Account, AccountChanges, AccountStatus, NewAccount,
};

/// Source of "now" for timestamps and the expiry date.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Account lifecycle: registration, listing, edits, removal and login.
///
/// Writes go through a single async gate so only one mutation reaches the
/// repository at a time; reads are not gated.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    clock: Arc<dyn Clock>,
    write_gate: Arc<Mutex<()>>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Arc<dyn AccountRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> Result<Account, AccountError> {
        let new = self.prepare_new(name, email, phone, password)?;

        let _guard = self.write_gate.lock().await;
        let account = self.repo.insert(new).await?;
        info!(account_id = account.id, "account created");
        Ok(account)
    }

    /// Registers an account only while the store is empty.
    ///
    /// The emptiness check and the insert run under the write gate, so of
    /// several concurrent callers at most one gets `Some`. Input is only
    /// validated once the store is known to be empty.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn create_first(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> Result<Option<Account>, AccountError> {
        let _guard = self.write_gate.lock().await;
        if self.repo.count().await? > 0 {
            warn!("store already has accounts");
            return Ok(None);
        }
        let new = self.prepare_new(name, email, phone, password)?;
        let account = self.repo.insert(new).await?;
        info!(account_id = account.id, "first account created");
        Ok(Some(account))
    }

    fn prepare_new(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> Result<NewAccount, AccountError> {
        let name = required("name", name)?;
        let email = required("email", email)?;
        let password = required("password", password)?;
        validate_password(password).map_err(|v| {
            warn!(reason = %v, "password rejected by policy");
            AccountError::validation(v.to_string())
        })?;

        let created_at = self.clock.now();
        Ok(NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            phone: optional(phone),
            password_hash: digest_password(password),
            status: AccountStatus::Active,
            password_expiry: password_expiry_for(created_at),
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<Account>, AccountError> {
        let accounts = self.repo.list().await?;
        debug!(count = accounts.len(), "accounts listed");
        Ok(accounts)
    }

    pub async fn get(&self, id: i64) -> Result<Account, AccountError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound(id))
    }

    /// Replaces name, email and phone. Password, status and dates stay as they are.
    ///
    /// Name and email are trimmed and must not be blank, as on create.
    #[instrument(skip(self, name, email, phone))]
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Account, AccountError> {
        let name = required("name", name)?;
        let email = required("email", email)?;
        let changes = AccountChanges {
            name: name.to_string(),
            email: email.to_string(),
            phone: optional(phone),
            modified_at: self.clock.now(),
        };

        let _guard = self.write_gate.lock().await;
        match self.repo.update(id, changes).await? {
            Some(account) => {
                info!(account_id = id, "account updated");
                Ok(account)
            }
            None => {
                warn!(account_id = id, "update on unknown account");
                Err(AccountError::NotFound(id))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AccountError> {
        let _guard = self.write_gate.lock().await;
        if self.repo.delete(id).await? {
            info!(account_id = id, "account deleted");
            Ok(())
        } else {
            warn!(account_id = id, "delete on unknown account");
            Err(AccountError::NotFound(id))
        }
    }

    /// Checks credentials and stamps `last_access` on success.
    ///
    /// An unknown email and a wrong password produce the same error.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let email = email.trim();
        // digest up front so unknown emails cost the same as wrong passwords
        let candidate = digest_password(password.trim());
        if email.is_empty() {
            return Err(AccountError::AuthenticationFailure);
        }

        let matched = self
            .repo
            .find_by_email(email)
            .await?
            .into_iter()
            .find(|account| digests_match(&candidate, &account.password_hash));

        let Some(account) = matched else {
            warn!("login rejected");
            return Err(AccountError::AuthenticationFailure);
        };

        let _guard = self.write_gate.lock().await;
        match self
            .repo
            .touch_last_access(account.id, self.clock.now())
            .await?
        {
            Some(account) => {
                info!(account_id = account.id, "login succeeded");
                Ok(account)
            }
            None => {
                // removed between lookup and stamp
                warn!(account_id = account.id, "login rejected");
                Err(AccountError::AuthenticationFailure)
            }
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::validation(format!("{field} is required")));
    }
    Ok(value)
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
