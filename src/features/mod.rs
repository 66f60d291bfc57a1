pub mod frame_decode;
pub mod history;
pub mod history_store;
pub mod kv_store;
pub mod links;
pub mod scanner;

use crate::state::{AppState, Screen};
use crate::ui::{to_value_or_text, Button as UiButton, Row as UiRow, Text as UiText};
use rust_i18n::t;
use serde_json::Value;

/// Tab strip shared by both screens; the active tab is styled "primary".
pub fn tab_bar(current: Screen) -> Value {
    let scanner = t!("tabs.scanner");
    let history = t!("tabs.history");
    let tabs = [
        (Screen::Scanner, scanner.as_ref(), "scanner_screen", "tab_scanner"),
        (Screen::History, history.as_ref(), "history_screen", "tab_history"),
    ];
    let buttons: Vec<Value> = tabs
        .iter()
        .map(|(screen, label, action, id)| {
            let style = if *screen == current { "primary" } else { "secondary" };
            to_value_or_text(UiButton::new(label, action).id(id).style(style), id)
        })
        .collect();
    to_value_or_text(UiRow::new(buttons).spacing(8), "tab_bar")
}

pub fn push_last_error(children: &mut Vec<Value>, state: &AppState) {
    if let Some(err) = &state.last_error {
        children.push(to_value_or_text(
            UiText::new(&format!("Error: {err}"))
                .size(12.0)
                .tone("error")
                .content_description("error_text"),
            "error_text",
        ));
    }
}
