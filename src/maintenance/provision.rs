use thiserror::Error;

use crate::auth::hash_password;
use crate::content::{admins, AdminAccount};
use crate::database::DocumentStore;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("An admin account for '{0}' already exists")]
    AlreadyExists(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("The admin account could not be saved")]
    SaveFailed,
}

/// Provision an admin account with an argon2 password hash.
pub async fn create_admin(store: &dyn DocumentStore, email: &str, password: &str) -> Result<AdminAccount, ProvisionError> {
    let email = admins::normalize_email(email);
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'));
    if !valid {
        return Err(ProvisionError::InvalidEmail(email));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ProvisionError::WeakPassword);
    }
    if admins::by_email(store, &email).await.is_some() {
        return Err(ProvisionError::AlreadyExists(email));
    }

    let hash = hash_password(password).map_err(|e| ProvisionError::Hash(e.to_string()))?;
    let account = admins::create(store, &email, hash).await.ok_or(ProvisionError::SaveFailed)?;
    tracing::info!(email = %account.email, id = %account.id, "Admin account provisioned");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::content::testing::FailingStore;
    use crate::database::MemoryDocumentStore;

    #[tokio::test]
    async fn creates_hashed_account() {
        let store = MemoryDocumentStore::new();
        let account = create_admin(&store, " Chair@Example.org", "long enough").await.unwrap();
        assert_eq!(account.email, "chair@example.org");
        assert_ne!(account.password_hash, "long enough");
        assert!(verify_password("long enough", &account.password_hash).unwrap());
    }

    #[tokio::test]
    async fn rejects_bad_input_and_duplicates() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            create_admin(&store, "not-an-email", "long enough").await,
            Err(ProvisionError::InvalidEmail(_))
        ));
        assert!(matches!(
            create_admin(&store, "a@example.org", "short").await,
            Err(ProvisionError::WeakPassword)
        ));

        create_admin(&store, "a@example.org", "long enough").await.unwrap();
        assert!(matches!(
            create_admin(&store, "A@example.org", "another one").await,
            Err(ProvisionError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_store_fails_to_save() {
        assert!(matches!(
            create_admin(&FailingStore, "a@example.org", "long enough").await,
            Err(ProvisionError::SaveFailed)
        ));
    }
}
