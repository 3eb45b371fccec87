use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::model::UserId;

/// An account that can own changesets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub pass_crypt: String,
    #[serde(skip_serializing)]
    pub pass_salt: String,
    /// Private-data users may read but never edit
    pub data_public: bool,
}

impl User {
    pub fn new(
        id: UserId,
        display_name: String,
        email: String,
        password: &str,
        data_public: bool,
    ) -> Self {
        let pass_salt = uuid::Uuid::new_v4().simple().to_string();
        let pass_crypt = hash_password(&pass_salt, password);
        Self {
            id,
            display_name,
            email,
            pass_crypt,
            pass_salt,
            data_public,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let digest = hash_password(&self.pass_salt, password);
        digest.as_bytes().ct_eq(self.pass_crypt.as_bytes()).into()
    }

    /// Email and display name are both accepted as login names
    pub fn matches_login(&self, login: &str) -> bool {
        self.email.eq_ignore_ascii_case(login) || self.display_name == login
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Login name and password as sent with HTTP basic auth
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}
