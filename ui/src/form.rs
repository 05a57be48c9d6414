use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Flex, Layout, Position, Rect};
use ratatui::prelude::{Color, Line, Masked, Modifier, Span, StatefulWidget, Style, Widget};
use ratatui::widgets::{Block, Paragraph};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::data::{highlight, is_quit};

#[derive(Debug)]
pub enum FieldKind {
    Text,
    Secret,
    Choice { options: Vec<String>, selected: usize },
}

#[derive(Debug)]
pub struct Field {
    label: &'static str,
    input: Input,
    kind: FieldKind,
}

impl Field {
    pub fn text(label: &'static str) -> Self {
        Self {
            label,
            input: Input::default(),
            kind: FieldKind::Text,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            kind: FieldKind::Secret,
            ..Self::text(label)
        }
    }

    pub fn choice(label: &'static str, options: Vec<String>) -> Self {
        Self {
            kind: FieldKind::Choice {
                options,
                selected: 0,
            },
            ..Self::text(label)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input = Input::new(value.into());
        self
    }

    pub fn value(&self) -> &str {
        match &self.kind {
            FieldKind::Choice { options, selected } => {
                options.get(*selected).map_or("", String::as_str)
            }
            FieldKind::Text | FieldKind::Secret => self.input.value(),
        }
    }

    fn handle_input_event(&mut self, key: KeyEvent) {
        match &mut self.kind {
            FieldKind::Choice { options, selected } => {
                let count = options.len();
                if count == 0 {
                    return;
                }
                match key.code {
                    KeyCode::Left => *selected = (*selected + count - 1) % count,
                    KeyCode::Right | KeyCode::Char(' ') => *selected = (*selected + 1) % count,
                    _ => {}
                }
            }
            FieldKind::Text | FieldKind::Secret => {
                self.input.handle_event(&Event::Key(key));
            }
        }
    }
}

pub enum FormAction {
    Quit,
    Pressed(&'static str),
    None,
}

/// Stack of labelled inputs above a row of buttons. Tab walks fields then
/// buttons; Enter on a button reports it.
#[derive(Debug)]
pub struct Form {
    title: &'static str,
    fields: Vec<Field>,
    buttons: Vec<&'static str>,
    focus: usize,
    pub notice: Option<String>,
    pub cursor_position: Option<Position>,
}

impl Form {
    pub fn new(title: &'static str, fields: Vec<Field>, buttons: Vec<&'static str>) -> Self {
        Self {
            title,
            fields,
            buttons,
            focus: 0,
            notice: None,
            cursor_position: None,
        }
    }

    fn stops(&self) -> usize {
        self.fields.len() + self.buttons.len()
    }

    pub fn switch_focus(&mut self) {
        self.focus = (self.focus + 1) % self.stops().max(1);
    }

    pub fn focused_button(&self) -> Option<&'static str> {
        self.focus
            .checked_sub(self.fields.len())
            .and_then(|index| self.buttons.get(index).copied())
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map_or("", Field::value)
    }

    /// Trimmed value, `None` when left blank.
    pub fn optional(&self, label: &str) -> Option<String> {
        Some(self.value(label).trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn on_key_event(&mut self, key: KeyEvent) -> FormAction {
        if is_quit(&key) {
            return FormAction::Quit;
        }
        match (key.kind, key.modifiers, key.code) {
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                self.switch_focus();
                FormAction::None
            }
            (KeyEventKind::Press, KeyModifiers::NONE, KeyCode::Enter) => {
                match self.focused_button() {
                    Some(button) => FormAction::Pressed(button),
                    None => {
                        self.switch_focus();
                        FormAction::None
                    }
                }
            }
            (KeyEventKind::Press, _, _) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.handle_input_event(key);
                }
                FormAction::None
            }
            _ => FormAction::None,
        }
    }
}

pub struct FormWidget;

impl StatefulWidget for FormWidget {
    type State = Form;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = state.fields.len() as u16 * 3 + 3 + 2 + 2;
        let [_, all, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .flex(Flex::Center)
        .areas(area);
        let [all] = Layout::horizontal([Constraint::Max(60)])
            .flex(Flex::Center)
            .areas(all);
        let block = Block::bordered().title(Line::from(state.title).centered());
        let inner = block.inner(all);
        block.render(all, buf);

        let mut rows = vec![Constraint::Length(3); state.fields.len()];
        rows.extend([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ]);
        let rows = Layout::vertical(rows).split(inner);

        state.cursor_position = None;
        for (index, field) in state.fields.iter().enumerate() {
            let focused = state.focus == index;
            let area = rows[index];
            let content = match &field.kind {
                FieldKind::Text => Span::raw(field.input.value()),
                FieldKind::Secret => {
                    Span::styled(Masked::new(field.input.value(), '*'), Color::White)
                }
                FieldKind::Choice { .. } => Span::raw(format!("< {} >", field.value())),
            };
            let border = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Paragraph::new(content)
                .block(Block::bordered().title(field.label).border_style(border))
                .render(area, buf);
            if focused && !matches!(field.kind, FieldKind::Choice { .. }) {
                state.cursor_position = Some(Position::new(
                    area.x + field.input.visual_cursor() as u16 + 1,
                    area.y + 1,
                ));
            }
        }

        let [buttons, instructions, notice] = [
            rows[state.fields.len()],
            rows[state.fields.len() + 1],
            rows[state.fields.len() + 2],
        ];
        let count = state.buttons.len() as u32;
        let buttons = Layout::horizontal(Constraint::from_ratios(vec![(1, count.max(1)); state.buttons.len()]))
            .split(buttons);
        let focused_button = state.focused_button();
        for (name, area) in state.buttons.iter().zip(buttons.iter()) {
            Paragraph::new(highlight(*name, focused_button == Some(*name)))
                .centered()
                .block(Block::bordered())
                .render(*area, buf);
        }
        Paragraph::new("Tab to switch focus, Enter to select, Esc to quit")
            .style(Style::default().add_modifier(Modifier::ITALIC))
            .centered()
            .render(instructions, buf);
        if let Some(message) = &state.notice {
            Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Yellow))
                .centered()
                .render(notice, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn form() -> Form {
        Form::new(
            "Sign in",
            vec![Field::text("Email"), Field::secret("Password")],
            vec!["Sign in", "Sign up"],
        )
    }

    #[test]
    fn tab_walks_fields_then_buttons() {
        let mut form = form();
        assert_eq!(form.focused_button(), None);
        form.switch_focus();
        form.switch_focus();
        assert_eq!(form.focused_button(), Some("Sign in"));
        form.switch_focus();
        assert_eq!(form.focused_button(), Some("Sign up"));
        form.switch_focus();
        assert_eq!(form.focused_button(), None);
    }

    #[test]
    fn typing_fills_focused_field() {
        let mut form = form();
        for c in "amina".chars() {
            form.on_key_event(press(KeyCode::Char(c)));
        }
        form.on_key_event(press(KeyCode::Tab));
        form.on_key_event(press(KeyCode::Char('x')));

        assert_eq!(form.value("Email"), "amina");
        assert_eq!(form.value("Password"), "x");
        assert_eq!(form.optional("Nope"), None);
    }

    #[test]
    fn enter_on_button_reports_it() {
        let mut form = form();
        form.switch_focus();
        form.switch_focus();
        assert!(matches!(
            form.on_key_event(press(KeyCode::Enter)),
            FormAction::Pressed("Sign in")
        ));
    }

    #[test]
    fn choice_cycles_both_ways() {
        let mut field = Field::choice("Role", vec!["patient".into(), "doctor".into()]);
        field.handle_input_event(press(KeyCode::Left));
        assert_eq!(field.value(), "doctor");
        field.handle_input_event(press(KeyCode::Right));
        assert_eq!(field.value(), "patient");
    }

    #[test]
    fn blank_values_are_optional() {
        let form = Form::new("Edit", vec![Field::text("Bio").with_value("  ")], vec![]);
        assert_eq!(form.optional("Bio"), None);
    }
}
