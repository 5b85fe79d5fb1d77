use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::{Credential, NewUser, User};
use crate::store::Store;
use crate::utils::email_registry;
use tracing::info;

/// A profile the identity provider has already verified.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub subject: String,
    pub email: String,
    pub display_name: String,
}

/// Finds or provisions the account behind an external login.
///
/// Match on subject first, then on email (linking the subject to that account),
/// otherwise create an employee holding only the external credential.
pub async fn resolve_external_login<S: Store>(store: &S, profile: ExternalProfile) -> Result<User, AppError> {
    if let Some(user) = store.find_user_by_external_id(&profile.subject).await? {
        return Ok(user);
    }

    let email = profile.email.trim().to_lowercase();

    if let Some(user) = store.find_user_by_email(&email).await? {
        let linked = store.link_external_identity(user.id, &profile.subject).await?;
        info!(user_id = linked.id, "Linked external identity to existing account");
        return Ok(linked);
    }

    let created = store
        .insert_user(NewUser {
            name: profile.display_name,
            email,
            role: Role::Employee,
            credential: Credential::External(profile.subject),
        })
        .await?;

    email_registry::record(&created.email).await;
    info!(user_id = created.id, "Provisioned account from external identity");
    Ok(created)
}
