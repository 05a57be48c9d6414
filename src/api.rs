use std::sync::Arc;

use tokio::sync::watch;
use validator::Validate;

use client::client::Client;
use types::domain::{
    CompleteProfileRequest, ResetPasswordRequest, SignInRequest, SignUpRequest, UpdateProfileRequest,
    User,
};
use types::state::AuthState;

use crate::error::{normalize, Error};
use crate::repository::auth::AuthRepository;
use crate::repository::directory::DirectoryRepository;
use crate::repository::profiles::ProfileRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::users::UserRepository;
use crate::routes::{RoleGate, Route};
use crate::service::auth::AuthService;
use crate::service::bootstrap::{BootstrapHandle, SessionBootstrapper};
use crate::service::users::UserService;
use crate::store::AuthStore;

/// Everything a screen needs: the auth snapshot, the route it implies and
/// the actions that change it.
#[derive(Clone)]
pub struct Api {
    pub bootstrapper: Arc<SessionBootstrapper>,
    pub auth_service: AuthService,
    pub user_service: UserService,
}

impl Api {
    pub fn new(client: Arc<Client>) -> Self {
        let auth_repository = Arc::new(AuthRepository::new(client.clone()));
        let user_repository = Arc::new(UserRepository::new(client.clone()));
        let profile_repository = Arc::new(ProfileRepository::new(client.clone()));
        let directory_repository = Arc::new(DirectoryRepository::new(client.clone()));
        let settings_repository = Arc::new(SettingsRepository::new(client));

        Self {
            bootstrapper: Arc::new(SessionBootstrapper::new(
                auth_repository.clone(),
                user_repository.clone(),
                profile_repository.clone(),
                AuthStore::new(),
            )),
            auth_service: AuthService {
                auth_repository: auth_repository.clone(),
                user_repository: user_repository.clone(),
                settings_repository,
                directory_repository: directory_repository.clone(),
            },
            user_service: UserService {
                auth_repository,
                user_repository,
                profile_repository,
                directory_repository,
            },
        }
    }

    /// Restores the stored session and starts following auth events. Keep
    /// the handle alive for as long as the snapshot should stay current.
    pub fn start(&self) -> BootstrapHandle {
        self.bootstrapper.clone().start()
    }

    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.bootstrapper.store().subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.bootstrapper.store().current()
    }

    pub fn gate(&self) -> RoleGate {
        RoleGate {
            auth_service: self.auth_service.clone(),
            user_service: self.user_service.clone(),
        }
    }

    pub async fn route(&self) -> Route {
        self.gate().resolve(&self.current()).await
    }

    fn signed_in_user(&self) -> Result<Arc<User>, Error> {
        self.current().user.ok_or(Error::NotAuthenticated)
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<(), Error> {
        request.validate()?;
        self.auth_service
            .sign_up(request)
            .await
            .map(drop)
            .map_err(normalize)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<(), Error> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service
            .sign_in(request.email, request.password)
            .await
            .map(drop)
            .map_err(normalize)
    }

    pub async fn sign_out(&self) -> Result<(), Error> {
        self.auth_service.sign_out().await.map_err(normalize)
    }

    pub async fn reset_password(&self, email: String) -> Result<(), Error> {
        let request = ResetPasswordRequest { email };
        request.validate()?;
        self.auth_service
            .reset_password(request.email)
            .await
            .map_err(normalize)
    }

    pub async fn update_profile(&self, request: UpdateProfileRequest) -> Result<(), Error> {
        request.validate()?;
        let user = self.signed_in_user()?;
        self.user_service
            .update_profile(user.id, request)
            .await
            .map_err(normalize)?;
        self.refresh_user().await
    }

    pub async fn refresh_user(&self) -> Result<(), Error> {
        self.bootstrapper.refresh().await.map_err(normalize)
    }

    pub async fn complete_profile(&self, request: CompleteProfileRequest) -> Result<(), Error> {
        request.validate()?;
        let user = self.signed_in_user()?;
        self.user_service
            .complete_profile(&user, request)
            .await
            .map_err(normalize)
    }

    /// Deactivates the account; rows are kept.
    pub async fn delete_account(&self) -> Result<(), Error> {
        let user = self.signed_in_user()?;
        self.user_service
            .deactivate(user.id)
            .await
            .map_err(normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::broadcast;
    use types::domain::{AuthEvent, Role};
    use types::state::Phase;

    use crate::test_support::{profile, session, user};

    struct Backend {
        auth: AuthRepository,
        users: UserRepository,
        profiles: ProfileRepository,
        directory: DirectoryRepository,
    }

    impl Backend {
        fn new() -> Self {
            Self {
                auth: AuthRepository::faux(),
                users: UserRepository::faux(),
                profiles: ProfileRepository::faux(),
                directory: DirectoryRepository::faux(),
            }
        }

        fn into_api(self) -> Api {
            let auth = Arc::new(self.auth);
            let users = Arc::new(self.users);
            let profiles = Arc::new(self.profiles);
            let directory = Arc::new(self.directory);
            Api {
                bootstrapper: Arc::new(SessionBootstrapper::new(
                    auth.clone(),
                    users.clone(),
                    profiles.clone(),
                    AuthStore::new(),
                )),
                auth_service: AuthService {
                    auth_repository: auth.clone(),
                    user_repository: users.clone(),
                    settings_repository: Arc::new(SettingsRepository::faux()),
                    directory_repository: directory.clone(),
                },
                user_service: UserService {
                    auth_repository: auth,
                    user_repository: users,
                    profile_repository: profiles,
                    directory_repository: directory,
                },
            }
        }
    }

    fn sign_up(email: &str, password: &str, full_name: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
            role: Role::Patient,
            wilaya: None,
            commune: None,
            language: "fr".to_string(),
        }
    }

    #[rstest]
    #[case(sign_up("not-an-email", "long-enough", "Amina"), "email")]
    #[case(sign_up("amina@canstory.dz", "short", "Amina"), "password")]
    #[case(sign_up("amina@canstory.dz", "long-enough", "A"), "full_name")]
    #[case(sign_up("nope", "short", "A"), "email, full_name, password")]
    #[tokio::test]
    async fn sign_up_rejects_invalid_forms(#[case] request: SignUpRequest, #[case] fields: &str) {
        // No mocks: reaching the backend would panic.
        let api = Backend::new().into_api();

        let error = api.sign_up(request).await.unwrap_err();

        assert_eq!(error, Error::InvalidInput(fields.to_string()));
    }

    #[tokio::test]
    async fn sign_in_with_malformed_email_is_rejected_locally() {
        let api = Backend::new().into_api();

        let error = api
            .sign_in(SignInRequest {
                email: "amina".to_string(),
                password: "whatever1".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(error, Error::InvalidEmailOrPassword);
    }

    #[tokio::test]
    async fn backend_message_reaches_the_caller() {
        let mut backend = Backend::new();
        let auth = &mut backend.auth;
        faux::when!(auth.sign_in)
            .then(|_| Err(Error::Backend("Invalid login credentials".to_string()).into()));
        let api = backend.into_api();

        let error = api
            .sign_in(SignInRequest {
                email: "amina@canstory.dz".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn unknown_failures_are_unexpected() {
        let mut backend = Backend::new();
        let auth = &mut backend.auth;
        faux::when!(auth.reset_password).then(|_| Err(eyre::eyre!("dns error")));
        let api = backend.into_api();

        let error = api
            .reset_password("amina@canstory.dz".to_string())
            .await
            .unwrap_err();

        assert_eq!(error, Error::Unexpected);
    }

    #[tokio::test]
    async fn profile_actions_require_a_user() {
        let api = Backend::new().into_api();

        assert_eq!(
            api.update_profile(UpdateProfileRequest::default()).await,
            Err(Error::NotAuthenticated)
        );
        assert_eq!(api.delete_account().await, Err(Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn update_profile_refreshes_the_snapshot() {
        let renamed = Arc::new(AtomicU32::new(0));
        let mut backend = Backend::new();
        let auth = &mut backend.auth;
        let users = &mut backend.users;
        let profiles = &mut backend.profiles;
        let patient = user(Role::Patient, true);
        faux::when!(auth.get_session).then(move |_| Ok(Some(session(patient.id))));
        let seen = renamed.clone();
        faux::when!(users.get).then(move |_| {
            let mut row = user(Role::Patient, true);
            if seen.load(Ordering::SeqCst) > 0 {
                row.full_name = "Amina B.".to_string();
            }
            Ok(Some(row))
        });
        faux::when!(users.touch_last_login).then(|_| Ok(()));
        let writes = renamed.clone();
        faux::when!(users.update).then(move |_| {
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        faux::when!(profiles.get).then(|id| Ok(Some(profile(id))));
        let api = backend.into_api();
        api.bootstrapper.initialize().await;

        api.update_profile(UpdateProfileRequest {
            full_name: Some("Amina B.".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        let state = api.current();
        assert_eq!(state.user.unwrap().full_name, "Amina B.");
        assert!(state.profile.is_some());
    }

    #[tokio::test]
    async fn deactivated_doctor_ends_anonymous() {
        let (sender, _) = broadcast::channel(8);
        let mut backend = Backend::new();
        let auth = &mut backend.auth;
        let users = &mut backend.users;
        let profiles = &mut backend.profiles;
        let doctor = user(Role::Doctor, false);
        faux::when!(auth.get_session).then(move |_| Ok(Some(session(doctor.id))));
        let events = sender.clone();
        faux::when!(auth.events).then(move |_| events.subscribe());
        let signed_out = sender.clone();
        faux::when!(auth.sign_out).then(move |_| {
            signed_out.send(AuthEvent::SignedOut).ok();
            Ok(())
        });
        faux::when!(users.get).then(|_| Ok(Some(user(Role::Doctor, false))));
        faux::when!(users.touch_last_login).then(|_| Ok(()));
        faux::when!(profiles.get).then(|_| Ok(None));
        let api = backend.into_api();
        let mut state = api.state();

        let _handle = api.start();
        state
            .wait_for(|state| state.phase() == Phase::Authenticated)
            .await
            .unwrap();

        let route = api.route().await;
        assert!(matches!(route, Route::AccessDenied(_)));

        state
            .wait_for(|state| state.phase() == Phase::Anonymous)
            .await
            .unwrap();
        assert_eq!(api.route().await, Route::SignIn);
    }
}
