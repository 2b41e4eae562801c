// 👤 User Entity - Owner of calculations
//
// The calculation core only needs a user id to exist; this record mirrors
// what the surrounding system stores. Email and username are unique at the
// database level (see db.rs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable identity (UUID), generated at construction.
    pub id: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,

    /// Already-hashed password. Hashing itself happens upstream.
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Self {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name for logs and UIs.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
