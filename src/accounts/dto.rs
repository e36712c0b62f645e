use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::repo_types::Account;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Request body for registering an account.
#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

/// Request body for editing an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Account as shown to clients. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicAccount {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: &'static str,
    #[serde(with = "iso_date")]
    pub password_expiry: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_access: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

impl From<Account> for PublicAccount {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            name: a.name,
            email: a.email,
            phone: a.phone,
            status: a.status.as_str(),
            password_expiry: a.password_expiry,
            created_at: a.created_at,
            last_access: a.last_access,
            last_modified: a.last_modified,
        }
    }
}
