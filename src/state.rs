use crate::features::history::HistoryState;
use crate::features::scanner::ScannerState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Scanner,
    History,
}

/// A button on a modal prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertButton {
    pub text: String,
    /// Action dispatched back when pressed; `None` just dismisses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// "default", "cancel" or "destructive".
    pub style: String,
}

impl AlertButton {
    pub fn new(text: impl Into<String>, action: Option<&str>, style: &str) -> Self {
        Self {
            text: text.into(),
            action: action.map(str::to_string),
            style: style.to_string(),
        }
    }
}

/// One-shot instruction for the host, delivered with the next response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    OpenUrl {
        url: String,
    },
    Alert {
        title: String,
        message: String,
        buttons: Vec<AlertButton>,
    },
    RequestPermission {
        permission: String,
    },
}

pub struct AppState {
    pub nav_stack: Vec<Screen>,
    pub locale: String,
    pub scanner: ScannerState,
    pub history: HistoryState,
    pub last_error: Option<String>,
    pub effects: Vec<Effect>,
}

impl AppState {
    // const so it can be used in static initialization
    pub const fn new() -> Self {
        Self {
            nav_stack: Vec::new(),
            locale: String::new(),
            scanner: ScannerState::AwaitingPermission,
            history: HistoryState::new(),
            last_error: None,
            effects: Vec::new(),
        }
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::Scanner);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().copied().unwrap_or(Screen::Scanner)
    }

    /// Tabs swap the visible screen instead of stacking.
    pub fn replace_current(&mut self, screen: Screen) {
        self.ensure_navigation();
        if let Some(last) = self.nav_stack.last_mut() {
            *last = screen;
        }
    }

    pub fn reset_navigation(&mut self) {
        self.nav_stack.clear();
        self.nav_stack.push(Screen::Scanner);
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn reset_runtime(&mut self) {
        self.scanner = ScannerState::AwaitingPermission;
        self.history.reset();
        self.last_error = None;
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn navigation_defaults_to_scanner() {
        let mut state = AppState::new();
        assert_eq!(state.current_screen(), Screen::Scanner);
        state.replace_current(Screen::History);
        assert_eq!(state.current_screen(), Screen::History);
        assert_eq!(state.nav_stack.len(), 1);
        state.reset_navigation();
        assert_eq!(state.current_screen(), Screen::Scanner);
    }

    #[test]
    fn effects_are_taken_once() {
        let mut state = AppState::new();
        state.push_effect(Effect::OpenUrl {
            url: "https://example.com".into(),
        });
        assert_eq!(state.take_effects().len(), 1);
        assert!(state.take_effects().is_empty());
    }

    #[test]
    fn effect_wire_shape() {
        let effect = Effect::Alert {
            title: "Clear history".into(),
            message: "Remove all scanned items?".into(),
            buttons: vec![
                AlertButton::new("Cancel", Some("history_clear_cancel"), "cancel"),
                AlertButton::new("OK", None, "default"),
            ],
        };
        let val = serde_json::to_value(effect).unwrap();
        assert_eq!(val["type"], "alert");
        assert_eq!(val["buttons"][0]["action"], "history_clear_cancel");
        assert!(val["buttons"][1].get("action").is_none());

        let open = serde_json::to_value(Effect::OpenUrl {
            url: "https://example.com".into(),
        })
        .unwrap();
        assert_eq!(open, json!({"type": "open_url", "url": "https://example.com"}));
    }
}
