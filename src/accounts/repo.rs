use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::error::RepoError;
use super::repo_types::{Account, AccountChanges, AccountRow, NewAccount};

/// Persistence seam for accounts. Every method is a single statement.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn insert(&self, new: NewAccount) -> Result<Account, RepoError>;
    /// All accounts, ascending id.
    async fn list(&self) -> Result<Vec<Account>, RepoError>;
    async fn count(&self) -> Result<i64, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, RepoError>;
    /// Email is not unique, so this may return several accounts.
    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepoError>;
    async fn update(&self, id: i64, changes: AccountChanges)
        -> Result<Option<Account>, RepoError>;
    /// Returns false when no row had that id.
    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
    async fn touch_last_access(
        &self,
        id: i64,
        at: OffsetDateTime,
    ) -> Result<Option<Account>, RepoError>;
}

#[derive(Clone)]
pub struct PgAccountRepository {
    db: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, new: NewAccount) -> Result<Account, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (name, email, phone, password_hash, status, password_expiry, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, email, phone, password_hash, status, password_expiry,
                      created_at, last_access, last_modified
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.password_hash)
        .bind(new.status.as_str())
        .bind(new.password_expiry)
        .bind(new.created_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Account>, RepoError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, name, email, phone, password_hash, status, password_expiry,
                   created_at, last_access, last_modified
            FROM accounts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn count(&self) -> Result<i64, RepoError> {
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM accounts"#)
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, name, email, phone, password_hash, status, password_expiry,
                   created_at, last_access, last_modified
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepoError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, name, email, phone, password_hash, status, password_expiry,
                   created_at, last_access, last_modified
            FROM accounts
            WHERE email = $1
            ORDER BY id
            "#,
        )
        .bind(email)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn update(
        &self,
        id: i64,
        changes: AccountChanges,
    ) -> Result<Option<Account>, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET name = $1, email = $2, phone = $3, last_modified = $4
            WHERE id = $5
            RETURNING id, name, email, phone, password_hash, status, password_expiry,
                      created_at, last_access, last_modified
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.modified_at)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_access(
        &self,
        id: i64,
        at: OffsetDateTime,
    ) -> Result<Option<Account>, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET last_access = $1
            WHERE id = $2
            RETURNING id, name, email, phone, password_hash, status, password_expiry,
                      created_at, last_access, last_modified
            "#,
        )
        .bind(at)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Account::from))
    }
}
