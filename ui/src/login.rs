use canstory::Api;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::prelude::StatefulWidget;
use types::domain::{Role, SignInRequest, SignUpRequest};

use crate::data::{OnKeyEvent, Screen, ScreenChange};
use crate::form::{Field, Form, FormAction, FormWidget};

const SIGN_IN: &str = "Sign in";
const SIGN_UP: &str = "Sign up";
const FORGOT: &str = "Forgot password";
const CREATE: &str = "Create account";
const BACK: &str = "Back";

const ROLES: [Role; 6] = [
    Role::Patient,
    Role::Doctor,
    Role::Pharmacy,
    Role::Association,
    Role::CancerCenter,
    Role::Laboratory,
];

#[derive(Debug)]
pub struct LoginScreenData {
    pub form: Form,
    language: String,
}

impl LoginScreenData {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            form: Form::new(
                "Canstory",
                vec![Field::text("Email"), Field::secret("Password")],
                vec![SIGN_IN, SIGN_UP, FORGOT],
            ),
            language: language.into(),
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.form.notice = Some(notice.into());
        self
    }
}

impl From<LoginScreenData> for ScreenChange {
    fn from(data: LoginScreenData) -> Self {
        ScreenChange::Switch(Screen::Login(data))
    }
}

#[async_trait::async_trait]
impl OnKeyEvent for LoginScreenData {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange> {
        let change = match self.form.on_key_event(key) {
            FormAction::Quit => ScreenChange::Quit,
            FormAction::Pressed(SIGN_IN) => {
                api.sign_in(SignInRequest {
                    email: self.form.value("Email").trim().to_string(),
                    password: self.form.value("Password").to_string(),
                })
                .await?;
                ScreenChange::None
            }
            FormAction::Pressed(SIGN_UP) => SignUpScreenData::new(&self.language).into(),
            FormAction::Pressed(FORGOT) => {
                api.reset_password(self.form.value("Email").trim().to_string())
                    .await?;
                self.form.notice = Some("Check your inbox for a reset link".to_string());
                ScreenChange::None
            }
            FormAction::Pressed(_) | FormAction::None => ScreenChange::None,
        };
        Ok(change)
    }
}

#[derive(Debug)]
pub struct SignUpScreenData {
    pub form: Form,
    language: String,
}

impl SignUpScreenData {
    pub fn new(language: &str) -> Self {
        Self {
            form: Form::new(
                "Join Canstory",
                vec![
                    Field::text("Email"),
                    Field::secret("Password"),
                    Field::text("Full name"),
                    Field::choice("Role", ROLES.iter().map(|r| r.to_string()).collect()),
                    Field::text("Wilaya"),
                    Field::text("Commune"),
                ],
                vec![CREATE, BACK],
            ),
            language: language.to_string(),
        }
    }

    fn role(&self) -> Role {
        let selected = self.form.value("Role");
        ROLES
            .into_iter()
            .find(|role| role.to_string() == selected)
            .unwrap_or(Role::Patient)
    }

    fn request(&self) -> SignUpRequest {
        SignUpRequest {
            email: self.form.value("Email").trim().to_string(),
            password: self.form.value("Password").to_string(),
            full_name: self.form.value("Full name").trim().to_string(),
            role: self.role(),
            wilaya: self.form.optional("Wilaya"),
            commune: self.form.optional("Commune"),
            language: self.language.clone(),
        }
    }
}

impl From<SignUpScreenData> for ScreenChange {
    fn from(data: SignUpScreenData) -> Self {
        ScreenChange::Switch(Screen::SignUp(data))
    }
}

#[async_trait::async_trait]
impl OnKeyEvent for SignUpScreenData {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange> {
        let change = match self.form.on_key_event(key) {
            FormAction::Quit => ScreenChange::Quit,
            FormAction::Pressed(CREATE) => {
                api.sign_up(self.request()).await?;
                LoginScreenData::new(&self.language)
                    .with_notice("Account created. Confirm your email if asked, then sign in")
                    .into()
            }
            FormAction::Pressed(BACK) => LoginScreenData::new(&self.language).into(),
            FormAction::Pressed(_) | FormAction::None => ScreenChange::None,
        };
        Ok(change)
    }
}

pub struct LoginScreenWidget;

impl StatefulWidget for LoginScreenWidget {
    type State = LoginScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        FormWidget.render(area, buf, &mut state.form);
    }
}

pub struct SignUpScreenWidget;

impl StatefulWidget for SignUpScreenWidget {
    type State = SignUpScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        FormWidget.render(area, buf, &mut state.form);
    }
}
