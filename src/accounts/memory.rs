use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::RepoError;
use super::repo::AccountRepository;
use super::repo_types::{Account, AccountChanges, NewAccount};

struct MemoryData {
    accounts: BTreeMap<i64, Account>, // ordered by id
    next_id: i64,
}

/// Process-local account store, used by tests and `ACCOUNT_STORE=memory`.
pub struct MemoryAccountRepository {
    data: Mutex<MemoryData>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(MemoryData {
                accounts: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn insert(&self, new: NewAccount) -> Result<Account, RepoError> {
        let mut data = self.data.lock().await;
        let id = data.next_id;
        data.next_id += 1;
        let account = Account {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            status: new.status,
            password_expiry: new.password_expiry,
            created_at: new.created_at,
            last_access: None,
            last_modified: None,
        };
        data.accounts.insert(id, account.clone());
        debug!(account_id = id, "memory insert");
        Ok(account)
    }

    async fn list(&self) -> Result<Vec<Account>, RepoError> {
        let data = self.data.lock().await;
        Ok(data.accounts.values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, RepoError> {
        let data = self.data.lock().await;
        Ok(data.accounts.len() as i64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, RepoError> {
        let data = self.data.lock().await;
        Ok(data.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepoError> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .filter(|a| a.email == email)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        changes: AccountChanges,
    ) -> Result<Option<Account>, RepoError> {
        let mut data = self.data.lock().await;
        Ok(data.accounts.get_mut(&id).map(|account| {
            account.name = changes.name;
            account.email = changes.email;
            account.phone = changes.phone;
            account.last_modified = Some(changes.modified_at);
            account.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().await;
        Ok(data.accounts.remove(&id).is_some())
    }

    async fn touch_last_access(
        &self,
        id: i64,
        at: OffsetDateTime,
    ) -> Result<Option<Account>, RepoError> {
        let mut data = self.data.lock().await;
        Ok(data.accounts.get_mut(&id).map(|account| {
            account.last_access = Some(at);
            account.clone()
        }))
    }
}
