use std::sync::Arc;

use canstory::Api;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::prelude::{Line, StatefulWidget, Widget};
use ratatui::style::Stylize;
use ratatui::widgets::{Block, Paragraph, Wrap};
use types::domain::{Profile, UpdateProfileRequest, User};
use types::state::AuthState;

use crate::data::{is_quit, OnKeyEvent, Screen, ScreenChange};
use crate::form::{Field, Form, FormAction, FormWidget};

const SAVE: &str = "Save";
const CANCEL: &str = "Cancel";

#[derive(Debug)]
pub struct HomeScreenData {
    pub user: Arc<User>,
    pub profile: Option<Arc<Profile>>,
    confirm_delete: bool,
}

impl HomeScreenData {
    pub fn from_state(state: &AuthState) -> Option<Self> {
        Some(Self {
            user: state.user.clone()?,
            profile: state.profile.clone(),
            confirm_delete: false,
        })
    }

    fn instructions(&self) -> Line<'static> {
        if self.confirm_delete {
            vec![
                "Deactivate this account? ".into(),
                "<y>".red().bold(),
                " Keep it ".into(),
                "<any key>".light_blue().bold(),
            ]
            .into()
        } else {
            vec![
                "Edit ".into(),
                "<e>".light_blue().bold(),
                " Refresh ".into(),
                "<r>".light_blue().bold(),
                " Sign out ".into(),
                "<o>".light_blue().bold(),
                " Deactivate ".into(),
                "<x>".red().bold(),
                " Quit ".into(),
                "<Esc>".light_blue().bold(),
            ]
            .into()
        }
    }
}

impl From<HomeScreenData> for ScreenChange {
    fn from(data: HomeScreenData) -> Self {
        ScreenChange::Switch(Screen::Home(data))
    }
}

#[async_trait::async_trait]
impl OnKeyEvent for HomeScreenData {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange> {
        if key.kind != KeyEventKind::Press {
            return Ok(ScreenChange::None);
        }
        if self.confirm_delete {
            self.confirm_delete = false;
            if key.code == KeyCode::Char('y') {
                api.delete_account().await?;
            }
            return Ok(ScreenChange::None);
        }
        if is_quit(&key) {
            return Ok(ScreenChange::Quit);
        }
        let change = match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('e')) => {
                EditProfileScreenData::new(&self.user, self.profile.as_deref()).into()
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => {
                api.refresh_user().await?;
                ScreenChange::None
            }
            (KeyModifiers::NONE, KeyCode::Char('o')) => {
                api.sign_out().await?;
                ScreenChange::None
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) => {
                self.confirm_delete = true;
                ScreenChange::None
            }
            _ => ScreenChange::None,
        };
        Ok(change)
    }
}

pub struct HomeWidget;

impl StatefulWidget for HomeWidget {
    type State = HomeScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::bordered()
            .title(Line::from(format!("Canstory | {}", state.user.full_name)).centered())
            .title_bottom(state.instructions().centered());
        let inner = block.inner(area);
        block.render(area, buf);

        let [account, about] = Layout::horizontal([Constraint::Ratio(1, 2); 2]).areas(inner);
        let user = &state.user;
        let place = [user.commune.as_deref(), user.wilaya.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let last_login = user
            .last_login_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        Paragraph::new(vec![
            Line::from(vec!["Email: ".bold(), user.email.as_str().into()]),
            Line::from(vec!["Role: ".bold(), user.role.to_string().into()]),
            Line::from(vec!["Location: ".bold(), place.into()]),
            Line::from(vec!["Language: ".bold(), user.language.as_str().into()]),
            Line::from(vec!["Last sign-in: ".bold(), last_login.into()]),
        ])
        .block(Block::bordered().title("Account"))
        .render(account, buf);

        let profile = state.profile.as_deref();
        let field = |value: Option<&String>| value.map_or("-".to_string(), String::clone);
        Paragraph::new(vec![
            Line::from("Bio".bold()),
            Line::from(field(profile.and_then(|p| p.bio.as_ref()))),
            Line::default(),
            Line::from(vec![
                "Specialization: ".bold(),
                field(profile.and_then(|p| p.specialization.as_ref())).into(),
            ]),
            Line::from(vec![
                "Address: ".bold(),
                field(profile.and_then(|p| p.address.as_ref())).into(),
            ]),
            Line::from(vec![
                "Website: ".bold(),
                field(profile.and_then(|p| p.website.as_ref())).into(),
            ]),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::bordered().title("Profile"))
        .render(about, buf);
    }
}

#[derive(Debug)]
pub struct EditProfileScreenData {
    pub form: Form,
}

impl EditProfileScreenData {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        let current = |value: Option<&String>| value.cloned().unwrap_or_default();
        Self {
            form: Form::new(
                "Edit profile",
                vec![
                    Field::text("Full name").with_value(user.full_name.clone()),
                    Field::text("Wilaya").with_value(current(user.wilaya.as_ref())),
                    Field::text("Commune").with_value(current(user.commune.as_ref())),
                    Field::text("Bio").with_value(current(profile.and_then(|p| p.bio.as_ref()))),
                    Field::text("Website")
                        .with_value(current(profile.and_then(|p| p.website.as_ref()))),
                ],
                vec![SAVE, CANCEL],
            ),
        }
    }

    fn request(&self) -> UpdateProfileRequest {
        UpdateProfileRequest {
            full_name: self.form.optional("Full name"),
            wilaya: self.form.optional("Wilaya"),
            commune: self.form.optional("Commune"),
            bio: self.form.optional("Bio"),
            website: self.form.optional("Website"),
            ..Default::default()
        }
    }
}

impl From<EditProfileScreenData> for ScreenChange {
    fn from(data: EditProfileScreenData) -> Self {
        ScreenChange::Switch(Screen::EditProfile(data))
    }
}

fn back_home(api: &Api) -> ScreenChange {
    HomeScreenData::from_state(&api.current()).map_or(ScreenChange::None, ScreenChange::from)
}

#[async_trait::async_trait]
impl OnKeyEvent for EditProfileScreenData {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange> {
        let change = match self.form.on_key_event(key) {
            FormAction::Quit | FormAction::Pressed(CANCEL) => back_home(api),
            FormAction::Pressed(SAVE) => {
                api.update_profile(self.request()).await?;
                back_home(api)
            }
            FormAction::Pressed(_) | FormAction::None => ScreenChange::None,
        };
        Ok(change)
    }
}

pub struct EditProfileWidget;

impl StatefulWidget for EditProfileWidget {
    type State = EditProfileScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        FormWidget.render(area, buf, &mut state.form);
    }
}
