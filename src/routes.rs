use log::{info, warn};
use tap::TapFallible;

use types::domain::Role;
use types::error::Error;
use types::state::AuthState;

use crate::service::auth::AuthService;
use crate::service::users::UserService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Splash,
    SignIn,
    Main,
    CompleteProfile,
    AccessDenied(String),
}

/// Decides where a snapshot may navigate.
#[derive(Clone)]
pub struct RoleGate {
    pub auth_service: AuthService,
    pub user_service: UserService,
}

impl RoleGate {
    /// Only doctors are gated. A deactivated doctor is signed out on the
    /// spot; the resulting `SignedOut` event moves the snapshot to anonymous.
    pub async fn resolve(&self, state: &AuthState) -> Route {
        if !state.initialized || state.loading {
            return Route::Splash;
        }
        let Some(user) = state.user.as_deref() else {
            return Route::SignIn;
        };
        if user.role != Role::Doctor {
            return Route::Main;
        }

        if !user.is_active {
            info!("Refusing deactivated doctor {}", user.id);
            self
                .auth_service
                .sign_out()
                .await
                .tap_err(|e| warn!("Sign-out of deactivated doctor failed: {:?}", e))
                .ok();
            return Route::AccessDenied(Error::AccountDisabled.to_string());
        }

        match self.user_service.is_profile_complete(user).await {
            Ok(true) => Route::Main,
            Ok(false) => Route::CompleteProfile,
            Err(e) => {
                warn!("Could not check listing for {}, letting through: {:?}", user.id, e);
                Route::Main
            }
        }
    }
}
