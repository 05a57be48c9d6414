use canstory::Api;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::prelude::StatefulWidget;
use types::domain::CompleteProfileRequest;

use crate::data::{OnKeyEvent, ScreenChange};
use crate::form::{Field, Form, FormAction, FormWidget};

const SUBMIT: &str = "Submit";
const SIGN_OUT: &str = "Sign out";

/// Shown to doctors until their directory listing is filled in.
#[derive(Debug)]
pub struct CompleteProfileScreenData {
    pub form: Form,
}

impl Default for CompleteProfileScreenData {
    fn default() -> Self {
        let mut form = Form::new(
            "Complete your listing",
            vec![
                Field::text("Specialization"),
                Field::text("Address"),
                Field::text("Phone"),
            ],
            vec![SUBMIT, SIGN_OUT],
        );
        form.notice = Some("Patients find you through this listing".to_string());
        Self { form }
    }
}

#[async_trait::async_trait]
impl OnKeyEvent for CompleteProfileScreenData {
    async fn on_key_event(&mut self, key: KeyEvent, api: &Api) -> Result<ScreenChange> {
        match self.form.on_key_event(key) {
            FormAction::Quit => return Ok(ScreenChange::Quit),
            FormAction::Pressed(SUBMIT) => {
                api.complete_profile(CompleteProfileRequest {
                    specialization: self.form.value("Specialization").trim().to_string(),
                    address: self.form.value("Address").trim().to_string(),
                    phone: self.form.value("Phone").trim().to_string(),
                })
                .await?;
                // the listing is not part of the snapshot; republish so the route is re-evaluated
                api.refresh_user().await?;
            }
            FormAction::Pressed(SIGN_OUT) => api.sign_out().await?,
            FormAction::Pressed(_) | FormAction::None => {}
        }
        Ok(ScreenChange::None)
    }
}

pub struct CompleteProfileWidget;

impl StatefulWidget for CompleteProfileWidget {
    type State = CompleteProfileScreenData;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        FormWidget.render(area, buf, &mut state.form);
    }
}
