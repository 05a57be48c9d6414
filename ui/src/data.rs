use std::borrow::Cow;

use canstory::Api;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::{Color, Span, Style};

use crate::complete_profile::CompleteProfileScreenData;
use crate::home::{EditProfileScreenData, HomeScreenData};
use crate::login::{LoginScreenData, SignUpScreenData};

pub enum ScreenChange {
    Quit,
    Switch(Screen),
    None,
}

#[derive(Debug)]
pub enum Screen {
    Splash,
    Login(LoginScreenData),
    SignUp(SignUpScreenData),
    Home(HomeScreenData),
    EditProfile(EditProfileScreenData),
    CompleteProfile(CompleteProfileScreenData),
}

#[async_trait::async_trait]
pub trait OnKeyEvent {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange>;
}

pub fn is_quit(key: &KeyEvent) -> bool {
    matches!(
        (key.kind, key.modifiers, key.code),
        (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Esc)
            | (KeyEventKind::Press, KeyModifiers::CONTROL, KeyCode::Char('c'))
    )
}

pub fn highlight<'a>(text: impl Into<Cow<'a, str>>, needed: bool) -> Span<'a> {
    if needed {
        Span::styled(text, Style::default().bg(Color::White).fg(Color::Black))
    } else {
        Span::styled(text, Style::default())
    }
}
