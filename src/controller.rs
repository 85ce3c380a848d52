use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::domain::{DashboardConfig, DashboardError, Message};
use crate::model::Model;
use crate::samples::SampleKind;

pub struct Controller {
    event_poll_time: u64
}

impl Controller {
    pub fn new(cfg: &DashboardConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DashboardError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Resize(width, height) => Ok(Some(Message::Resize(width as usize, height as usize))),
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('v') => Some(Message::ToggleColumn),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('o') => Some(Message::OpenFile),
            KeyCode::Char('1') => Some(Message::LoadSample(SampleKind::Sales)),
            KeyCode::Char('2') => Some(Message::LoadSample(SampleKind::Employees)),
            KeyCode::Char('3') => Some(Message::LoadSample(SampleKind::Orders)),
            KeyCode::Char('R') => Some(Message::Reset),
            KeyCode::Char('e') => Some(Message::ExportAll),
            KeyCode::Char('x') => Some(Message::ExportCsv),
            KeyCode::Char('j') => Some(Message::ExportJson),
            KeyCode::Char('i') => Some(Message::ExportChart),
            KeyCode::Char('t') => Some(Message::NextTheme),
            KeyCode::Tab => Some(Message::NextPanel),
            KeyCode::Char('c') => Some(Message::NextChartKind),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

}
