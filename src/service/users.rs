use std::sync::Arc;

use eyre::{ensure, Result};
use log::info;
use uuid::Uuid;

use types::domain::{CompleteProfileRequest, DirectoryEntry, UpdateProfileRequest, User};
use types::error::Error;

use crate::repository::auth::AuthRepository;
use crate::repository::directory::DirectoryRepository;
use crate::repository::profiles::{ProfilePatch, ProfileRepository};
use crate::repository::users::{UserPatch, UserRepository};

#[derive(Clone)]
pub struct UserService {
    pub auth_repository: Arc<AuthRepository>,
    pub user_repository: Arc<UserRepository>,
    pub profile_repository: Arc<ProfileRepository>,
    pub directory_repository: Arc<DirectoryRepository>,
}

impl UserService {
    /// Splits the request between `users` and `user_profiles`; a table the
    /// request does not touch is not written.
    pub async fn update_profile(&self, user_id: Uuid, request: UpdateProfileRequest) -> Result<()> {
        if request.touches_user() {
            self.user_repository
                .update(
                    user_id,
                    UserPatch {
                        full_name: request.full_name.clone(),
                        wilaya: request.wilaya.clone(),
                        commune: request.commune.clone(),
                        language: request.language.clone(),
                        avatar_url: request.avatar_url.clone(),
                        is_active: None,
                    },
                )
                .await?;
        }
        if request.touches_profile() {
            self.profile_repository
                .upsert(ProfilePatch {
                    user_id,
                    bio: request.bio,
                    specialization: request.specialization,
                    address: request.address,
                    website: request.website,
                })
                .await?;
        }
        Ok(())
    }

    /// Soft delete: the row stays, flagged inactive, and the session ends.
    pub async fn deactivate(&self, user_id: Uuid) -> Result<()> {
        self.user_repository
            .update(
                user_id,
                UserPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        info!("Deactivated account {}", user_id);
        self.auth_repository.sign_out().await
    }

    pub async fn is_profile_complete(&self, user: &User) -> Result<bool> {
        let entry = self.directory_repository.get(user.role, user.id).await?;
        Ok(entry.is_some_and(|entry| entry.is_complete()))
    }

    pub async fn complete_profile(&self, user: &User, request: CompleteProfileRequest) -> Result<()> {
        ensure!(
            user.role.is_professional(),
            Error::InvalidInput(format!("{} has no directory listing", user.role))
        );
        let existing = self.directory_repository.get(user.role, user.id).await?;
        let entry = DirectoryEntry {
            specialization: Some(request.specialization),
            address: Some(request.address),
            phone: Some(request.phone),
            ..existing.unwrap_or_else(|| DirectoryEntry::seed(user))
        };
        self.directory_repository.upsert(user.role, entry).await?;
        Ok(())
    }
}
