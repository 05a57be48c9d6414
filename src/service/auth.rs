use std::sync::Arc;

use eyre::{Result, WrapErr};
use log::{info, warn};
use serde_json::json;
use tap::TapFallible;

use types::domain::{DirectoryEntry, Session, SignUpRequest, User};

use crate::repository::auth::AuthRepository;
use crate::repository::directory::DirectoryRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::users::{NewUser, UserRepository};

#[derive(Clone)]
pub struct AuthService {
    pub auth_repository: Arc<AuthRepository>,
    pub user_repository: Arc<UserRepository>,
    pub settings_repository: Arc<SettingsRepository>,
    pub directory_repository: Arc<DirectoryRepository>,
}

impl AuthService {
    /// Creates the identity and the rows that hang off it. Settings and the
    /// directory listing are best effort once the `users` row exists.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User> {
        let metadata = json!({
            "full_name": request.full_name,
            "role": request.role,
        });
        let outcome = self
            .auth_repository
            .sign_up(request.email.clone(), request.password, metadata)
            .await?;
        if outcome.session.is_none() {
            info!("Sign-up for {} awaits email confirmation", outcome.user.id);
        }

        let user = self
            .user_repository
            .upsert(NewUser {
                id: outcome.user.id,
                email: outcome.user.email.unwrap_or(request.email),
                full_name: request.full_name,
                role: request.role,
                wilaya: request.wilaya,
                commune: request.commune,
                language: request.language,
                is_active: true,
            })
            .await
            .wrap_err("creating users row")?;

        self
            .settings_repository
            .create_defaults(user.id)
            .await
            .tap_err(|e| warn!("Could not create notification settings for {}: {:?}", user.id, e))
            .ok();

        if user.role.is_professional() {
            self
                .directory_repository
                .upsert(user.role, DirectoryEntry::seed(&user))
                .await
                .tap_err(|e| warn!("Could not seed {} listing for {}: {:?}", user.role, user.id, e))
                .ok();
        }

        Ok(user)
    }

    pub async fn sign_in(&self, email: String, password: String) -> Result<Session> {
        self.auth_repository.sign_in(email, password).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth_repository.sign_out().await
    }

    pub async fn reset_password(&self, email: String) -> Result<()> {
        self.auth_repository.reset_password(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};
    use types::domain::{AuthUser, Role};
    use types::error::Error;

    use client::client::SignUpOutcome;

    use crate::test_support::user;

    fn request(role: Role) -> SignUpRequest {
        SignUpRequest {
            email: "amina@canstory.dz".to_string(),
            password: "correct-horse".to_string(),
            full_name: "Amina Benali".to_string(),
            role,
            wilaya: Some("Oran".to_string()),
            commune: Some("Bir El Djir".to_string()),
            language: "fr".to_string(),
        }
    }

    struct Counters {
        settings: Arc<AtomicU32>,
        directory: Arc<AtomicU32>,
    }

    fn service() -> (AuthService, Counters) {
        let mut auth = AuthRepository::faux();
        faux::when!(auth.sign_up).then(|(_, _, _)| {
            Ok(SignUpOutcome {
                user: AuthUser {
                    id: uuid::Uuid::from_u128(42),
                    email: Some("amina@canstory.dz".to_string()),
                },
                session: None,
            })
        });

        let mut users = UserRepository::faux();
        faux::when!(users.upsert).then(move |new_user| {
            assert!(new_user.is_active);
            Ok(user(new_user.role, true))
        });

        let counters = Counters {
            settings: Arc::default(),
            directory: Arc::default(),
        };
        let mut settings = SettingsRepository::faux();
        let settings_calls = counters.settings.clone();
        faux::when!(settings.create_defaults).then(move |_| {
            settings_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let mut directory = DirectoryRepository::faux();
        let directory_calls = counters.directory.clone();
        faux::when!(directory.upsert).then(move |(_, entry)| {
            directory_calls.fetch_add(1, Ordering::SeqCst);
            Ok(entry)
        });

        let service = AuthService {
            auth_repository: Arc::new(auth),
            user_repository: Arc::new(users),
            settings_repository: Arc::new(settings),
            directory_repository: Arc::new(directory),
        };
        (service, counters)
    }

    #[rstest]
    #[case(Role::Patient, 0)]
    #[case(Role::Doctor, 1)]
    #[case(Role::Pharmacy, 1)]
    #[case(Role::CancerCenter, 1)]
    #[tokio::test]
    async fn sign_up_seeds_directory_for_professionals_only(
        #[case] role: Role,
        #[case] listings: u32,
    ) {
        let (service, counters) = service();

        let created = service.sign_up(request(role)).await.unwrap();

        assert_eq!(created.role, role);
        assert_eq!(counters.settings.load(Ordering::SeqCst), 1);
        assert_eq!(counters.directory.load(Ordering::SeqCst), listings);
    }

    #[tokio::test]
    async fn failed_settings_do_not_fail_sign_up() {
        let (mut service, _) = service();
        let mut settings = SettingsRepository::faux();
        faux::when!(settings.create_defaults).then(|_| Err(eyre::eyre!("row level security")));
        service.settings_repository = Arc::new(settings);

        assert!(service.sign_up(request(Role::Patient)).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_identity_stops_sign_up() {
        let (mut service, counters) = service();
        let mut auth = AuthRepository::faux();
        faux::when!(auth.sign_up)
            .then(|_| Err(Error::Backend("User already registered".to_string()).into()));
        service.auth_repository = Arc::new(auth);

        let error = service.sign_up(request(Role::Doctor)).await.unwrap_err();

        assert_eq!(
            error.downcast::<Error>().unwrap(),
            Error::Backend("User already registered".to_string())
        );
        assert_eq!(counters.settings.load(Ordering::SeqCst), 0);
        assert_eq!(counters.directory.load(Ordering::SeqCst), 0);
    }
}
