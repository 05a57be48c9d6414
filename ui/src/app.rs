use std::time::Duration;

use canstory::{Api, Route};
use chrono::{DateTime, Utc};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyEvent};
use log::{debug, warn};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};
use ratatui::{DefaultTerminal, Frame};
use tokio::sync::watch;
use types::state::AuthState;

use crate::complete_profile::{CompleteProfileScreenData, CompleteProfileWidget};
use crate::data::{is_quit, OnKeyEvent, Screen, ScreenChange};
use crate::home::{EditProfileWidget, HomeScreenData, HomeWidget};
use crate::login::{LoginScreenData, LoginScreenWidget, SignUpScreenWidget};

pub struct App {
    /// Is the application running?
    running: bool,
    api: Api,
    state: watch::Receiver<AuthState>,
    language: String,
    screen: Screen,
    error_message: Option<ErrorMessage>,
}

struct ErrorMessage {
    message: String,
    expiry_time: DateTime<Utc>,
}

impl ErrorMessage {
    fn new(message: String, lasts: Duration) -> Self {
        Self {
            message,
            expiry_time: Utc::now() + lasts,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_time
    }
}

impl From<String> for ErrorMessage {
    fn from(message: String) -> Self {
        Self::new(message, Duration::from_secs(3))
    }
}

impl App {
    pub fn new(api: Api, language: String) -> Self {
        let state = api.state();
        Self {
            running: true,
            api,
            state,
            language,
            screen: Screen::Splash,
            error_message: None,
        }
    }

    /// Run the application's main loop.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while self.running {
            self.follow_auth_state().await;
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_crossterm_events().await?;
        }
        Ok(())
    }

    /// Moves to the screen the latest snapshot routes to. Screens that
    /// belong to the current route are kept so half-filled forms survive.
    async fn follow_auth_state(&mut self) {
        if !self.state.has_changed().unwrap_or(false) {
            return;
        }
        let snapshot = self.state.borrow_and_update().clone();
        let route = self.api.gate().resolve(&snapshot).await;
        debug!("Auth state changed, routing to {:?}", route);

        self.screen = match (route, std::mem::replace(&mut self.screen, Screen::Splash)) {
            (Route::Splash, _) => Screen::Splash,
            (Route::SignIn, screen @ (Screen::Login(_) | Screen::SignUp(_))) => screen,
            (Route::SignIn, _) => Screen::Login(LoginScreenData::new(&self.language)),
            (Route::AccessDenied(message), _) => {
                self.error_message = Some(ErrorMessage::new(message, Duration::from_secs(8)));
                Screen::Login(LoginScreenData::new(&self.language))
            }
            (Route::CompleteProfile, screen @ Screen::CompleteProfile(_)) => screen,
            (Route::CompleteProfile, _) => {
                Screen::CompleteProfile(CompleteProfileScreenData::default())
            }
            (Route::Main, screen @ Screen::EditProfile(_)) => screen,
            (Route::Main, _) => match HomeScreenData::from_state(&snapshot) {
                Some(home) => Screen::Home(home),
                None => Screen::Splash,
            },
        };
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let cursor = match &mut self.screen {
            Screen::Splash => {
                frame.render_widget(SplashWidget, area);
                None
            }
            Screen::Login(data) => {
                frame.render_stateful_widget(LoginScreenWidget, area, data);
                data.form.cursor_position
            }
            Screen::SignUp(data) => {
                frame.render_stateful_widget(SignUpScreenWidget, area, data);
                data.form.cursor_position
            }
            Screen::Home(data) => {
                frame.render_stateful_widget(HomeWidget, area, data);
                None
            }
            Screen::EditProfile(data) => {
                frame.render_stateful_widget(EditProfileWidget, area, data);
                data.form.cursor_position
            }
            Screen::CompleteProfile(data) => {
                frame.render_stateful_widget(CompleteProfileWidget, area, data);
                data.form.cursor_position
            }
        };
        if let Some(position) = cursor {
            frame.set_cursor_position(position);
        }

        if let Some(error_message) = &self.error_message {
            if error_message.is_expired() {
                self.error_message = None;
            } else {
                let [_, popup_area] =
                    Layout::vertical(Constraint::from_percentages([85, 15])).areas(area);
                let [_, popup_area, _] =
                    Layout::horizontal(Constraint::from_ratios([(1, 4), (2, 4), (1, 4)]))
                        .areas(popup_area);
                frame.render_widget(
                    ErrorPopup {
                        message: error_message.message.clone(),
                    },
                    popup_area,
                );
            }
        }
    }

    /// Polls with a timeout so auth state changes are picked up between keys.
    async fn handle_crossterm_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = self.on_key_event(key).await {
                    warn!("Action failed: {}", e);
                    self.error_message.replace(e.to_string().into());
                }
            }
        }
        Ok(())
    }

    async fn on_key_event(&mut self, key: KeyEvent) -> Result<()> {
        let change = match &mut self.screen {
            Screen::Splash if is_quit(&key) => ScreenChange::Quit,
            Screen::Splash => ScreenChange::None,
            Screen::Login(data) => data.on_key_event(key, &self.api).await?,
            Screen::SignUp(data) => data.on_key_event(key, &self.api).await?,
            Screen::Home(data) => data.on_key_event(key, &self.api).await?,
            Screen::EditProfile(data) => data.on_key_event(key, &self.api).await?,
            Screen::CompleteProfile(data) => data.on_key_event(key, &self.api).await?,
        };
        match change {
            ScreenChange::Quit => self.quit(),
            ScreenChange::Switch(screen) => self.screen = screen,
            ScreenChange::None => {}
        }
        Ok(())
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }
}

struct SplashWidget;

impl Widget for SplashWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [center] = Layout::vertical([Constraint::Length(4)])
            .flex(Flex::Center)
            .areas(area);
        Paragraph::new(vec![
            Line::from("Canstory").style(Style::default().add_modifier(Modifier::BOLD)),
            Line::default(),
            Line::from("Loading...").style(Style::default().add_modifier(Modifier::ITALIC)),
        ])
        .centered()
        .render(center, buf);
    }
}

pub struct ErrorPopup {
    message: String,
}

impl Widget for ErrorPopup {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        Clear.render(area, buf);
        Paragraph::new(self.message)
            .block(
                Block::bordered()
                    .title("Error occurred")
                    .style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
