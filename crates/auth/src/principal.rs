use serde::{Deserialize, Serialize};

use tenantry_core::UserId;

/// An identity whose credentials have already been checked.
///
/// Produced after a password verification or a federation exchange; this is
/// the only input the token issuer accepts for the subject of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
}

impl VerifiedIdentity {
    pub fn new(user_id: UserId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}

/// Compose the display name the same way everywhere: `"{first} {last}"`.
pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}")
}
