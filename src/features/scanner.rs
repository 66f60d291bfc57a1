use crate::features::links::is_web_url;
use crate::features::{push_last_error, tab_bar};
use crate::state::{AppState, Effect, Screen};
use crate::ui::{
    to_value_or_text, Button as UiButton, CameraPreview as UiCameraPreview, Card as UiCard,
    Column as UiColumn, Progress as UiProgress, Row as UiRow, Text as UiText,
};
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const CAMERA_PERMISSION: &str = "camera";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub kind: String,
    pub data: String,
}

/// Scanner screen state. Decode callbacks are only honoured in `Scanning`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerState {
    AwaitingPermission,
    Denied,
    Scanning,
    Result(ScanResult),
}

impl ScannerState {
    pub fn is_accepting(&self) -> bool {
        matches!(self, Self::Scanning)
    }

    pub fn apply_permission(&mut self, granted: bool) {
        if !granted {
            *self = Self::Denied;
        } else if matches!(self, Self::AwaitingPermission | Self::Denied) {
            *self = Self::Scanning;
        }
    }

    /// Returns false when the callback was gated out.
    pub fn on_decoded(&mut self, kind: &str, data: &str) -> bool {
        if !self.is_accepting() {
            return false;
        }
        *self = Self::Result(ScanResult {
            kind: kind.to_string(),
            data: data.to_string(),
        });
        true
    }

    pub fn reset(&mut self) {
        if matches!(self, Self::Result(_)) {
            *self = Self::Scanning;
        }
    }

    /// The decoded payload, when it is a web URL.
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Result(result) if is_web_url(&result.data) => Some(&result.data),
            _ => None,
        }
    }
}

/// Mounting the screen asks the host for camera access if it is still unknown.
pub fn enter_scanner(state: &mut AppState) {
    state.replace_current(Screen::Scanner);
    if matches!(state.scanner, ScannerState::AwaitingPermission) {
        state.push_effect(Effect::RequestPermission {
            permission: CAMERA_PERMISSION.into(),
        });
    }
}

pub fn handle_permission(state: &mut AppState, status: Option<&str>) {
    let granted = matches!(status, Some("granted"));
    info!(granted, "camera permission result");
    state.scanner.apply_permission(granted);
}

pub fn handle_decoded(state: &mut AppState, kind: &str, data: &str) -> bool {
    let accepted = state.scanner.on_decoded(kind, data);
    if accepted {
        debug!(kind, len = data.len(), "barcode decoded");
    }
    accepted
}

pub fn handle_open_link(state: &mut AppState) {
    if let Some(url) = state.scanner.link().map(str::to_string) {
        state.push_effect(Effect::OpenUrl { url });
    }
}

fn platform_hint() -> Option<String> {
    if cfg!(target_os = "android") {
        Some(t!("scanner.footer_android").into_owned())
    } else if cfg!(target_os = "ios") {
        Some(t!("scanner.footer_ios").into_owned())
    } else {
        None
    }
}

pub fn render_scanner_screen(state: &AppState) -> Value {
    let mut children = vec![tab_bar(Screen::Scanner)];

    match &state.scanner {
        ScannerState::AwaitingPermission => {
            let msg = t!("scanner.requesting_permission");
            children.push(to_value_or_text(
                UiText::new(&msg).size(16.0).tone("info"),
                "scanner_pending",
            ));
            children.push(to_value_or_text(
                UiProgress::new().content_description("camera_permission_pending"),
                "scanner_progress",
            ));
        }
        ScannerState::Denied => {
            let denied = t!("scanner.permission_denied");
            let hint = t!("scanner.permission_hint");
            children.push(to_value_or_text(
                UiText::new(&denied)
                    .size(16.0)
                    .tone("error")
                    .content_description("camera_permission_denied"),
                "scanner_denied",
            ));
            children.push(to_value_or_text(
                UiText::new(&hint).size(16.0).tone("info"),
                "scanner_denied_hint",
            ));
        }
        ScannerState::Scanning => {
            let align = t!("scanner.align_hint");
            children.push(to_value_or_text(
                UiCameraPreview::new("scanner_decoded")
                    .overlay_text(&align)
                    .frame_size(260),
                "scanner_preview",
            ));
        }
        ScannerState::Result(result) => {
            children.push(render_result_card(result));
        }
    }

    if let Some(hint) = platform_hint() {
        children.push(to_value_or_text(
            UiText::new(&hint).size(12.0).tone("muted"),
            "scanner_footer",
        ));
    }
    push_last_error(&mut children, state);

    to_value_or_text(
        UiColumn::new(children).padding(16).id("ScannerScreen"),
        "scanner_root",
    )
}

fn render_result_card(result: &ScanResult) -> Value {
    let type_label = t!("scanner.type_label");
    let data_label = t!("scanner.data_label");
    let scan_again = t!("scanner.scan_again");
    let open_link = t!("common.open_link");

    let mut actions = vec![to_value_or_text(
        UiButton::new(&scan_again, "scanner_reset").id("scanner_reset_btn"),
        "scanner_reset_btn",
    )];
    if is_web_url(&result.data) {
        actions.push(to_value_or_text(
            UiButton::new(&open_link, "scanner_open_link")
                .id("scanner_open_link_btn")
                .style("primary"),
            "scanner_open_link_btn",
        ));
    }

    let body = vec![
        to_value_or_text(UiText::new(&type_label).tone("muted"), "result_type_label"),
        to_value_or_text(
            UiText::new(&result.kind).content_description("scan_result_type"),
            "result_type",
        ),
        to_value_or_text(UiText::new(&data_label).tone("muted"), "result_data_label"),
        to_value_or_text(
            UiText::new(&result.data)
                .selectable(true)
                .content_description("scan_result_data"),
            "result_data",
        ),
        to_value_or_text(UiRow::new(actions).spacing(12), "result_actions"),
    ];
    to_value_or_text(UiCard::new(body).padding(16), "result_card")
}
