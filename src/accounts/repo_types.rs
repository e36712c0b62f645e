use sqlx::FromRow;
use time::{Date, Duration, OffsetDateTime};

/// Days a password stays valid after the account is created.
pub const PASSWORD_TTL_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    /// Anything other than `active` reads as inactive.
    pub fn from_db(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("active") {
            AccountStatus::Active
        } else {
            AccountStatus::Inactive
        }
    }
}

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String, // sha-256 hex, never the plaintext
    pub status: AccountStatus,
    pub password_expiry: Date,
    pub created_at: OffsetDateTime,
    pub last_access: Option<OffsetDateTime>,
    pub last_modified: Option<OffsetDateTime>,
}

/// Row shape of the `accounts` table.
#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub status: String,
    pub password_expiry: Date,
    pub created_at: OffsetDateTime,
    pub last_access: Option<OffsetDateTime>,
    pub last_modified: Option<OffsetDateTime>,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            password_hash: r.password_hash,
            status: AccountStatus::from_db(&r.status),
            password_expiry: r.password_expiry,
            created_at: r.created_at,
            last_access: r.last_access,
            last_modified: r.last_modified,
        }
    }
}

/// Validated, hashed input for an insert. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub status: AccountStatus,
    pub password_expiry: Date,
    pub created_at: OffsetDateTime,
}

/// Fields replaced by an edit.
#[derive(Debug, Clone)]
pub struct AccountChanges {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub modified_at: OffsetDateTime,
}

pub fn password_expiry_for(created_at: OffsetDateTime) -> Date {
    created_at.date() + Duration::days(PASSWORD_TTL_DAYS)
}
