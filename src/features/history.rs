use crate::error::Result;
use crate::features::history_store::{without_index, LoadOutcome, ScanRecord};
use crate::features::links::is_web_url;
use crate::features::{push_last_error, tab_bar};
use crate::state::{AlertButton, AppState, Effect, Screen};
use crate::ui::{
    to_value_or_text, Button as UiButton, Card as UiCard, Column as UiColumn, Row as UiRow,
    Text as UiText, VirtualList as UiVirtualList,
};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

const PAYLOAD_MAX_LINES: u32 = 3;
pub const POLL_INTERVAL_MS: u64 = 150;

/// Storage work requested by a history handler; the router runs it off the
/// UI lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryJob {
    Load,
    Persist(Vec<ScanRecord>),
    Clear,
    Append(ScanRecord),
}

impl HistoryJob {
    /// Whether the job's result changes what the screen shows.
    fn updates_view(&self) -> bool {
        !matches!(self, Self::Persist(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryState {
    pub records: Vec<ScanRecord>,
    pub refreshing: bool,
    /// Stored entries skipped by the last load because they were incomplete.
    pub quarantined: usize,
    /// Jobs in flight whose result will change the list.
    pub pending: u32,
}

impl HistoryState {
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            refreshing: false,
            quarantined: 0,
            pending: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn awaiting_result(&self) -> bool {
        self.pending > 0
    }

    /// Bookkeeping for a job about to be queued.
    pub fn job_queued(&mut self, job: &HistoryJob) {
        if matches!(job, HistoryJob::Load) {
            self.refreshing = true;
        }
        if job.updates_view() {
            self.pending += 1;
        }
    }

    fn job_finished(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }
}

/// Mount: show the screen and read the stored list.
pub fn enter_history(state: &mut AppState) -> HistoryJob {
    state.replace_current(Screen::History);
    HistoryJob::Load
}

/// Remove by position, show the result at once, then write the whole list.
pub fn handle_delete(state: &mut AppState, index: usize) -> HistoryJob {
    let updated = without_index(&state.history.records, index);
    state.history.records = updated.clone();
    HistoryJob::Persist(updated)
}

pub fn handle_clear_request(state: &mut AppState) {
    state.push_effect(Effect::Alert {
        title: t!("history.clear_title").into_owned(),
        message: t!("history.clear_message").into_owned(),
        buttons: vec![
            AlertButton::new(
                t!("history.cancel").into_owned(),
                Some("history_clear_cancel"),
                "cancel",
            ),
            AlertButton::new(
                t!("history.clear").into_owned(),
                Some("history_clear_confirm"),
                "destructive",
            ),
        ],
    });
}

/// Web URLs open externally; anything else is shown as-is in a prompt.
pub fn handle_open(state: &mut AppState, index: usize) {
    let Some(record) = state.history.records.get(index) else {
        warn!(index, "history_open for missing index");
        return;
    };
    let effect = if is_web_url(&record.data) {
        Effect::OpenUrl {
            url: record.data.clone(),
        }
    } else {
        Effect::Alert {
            title: t!("history.scanned_data").into_owned(),
            message: record.data.clone(),
            buttons: vec![AlertButton::new(
                t!("history.ok").into_owned(),
                None,
                "default",
            )],
        }
    };
    state.push_effect(effect);
}

pub fn handle_append(
    kind: Option<String>,
    data: Option<String>,
    timestamp: Option<String>,
) -> std::result::Result<HistoryJob, String> {
    let data = data.ok_or_else(|| "history_append_missing_data".to_string())?;
    let kind = kind.unwrap_or_else(|| "unknown".into());
    let record = match timestamp {
        Some(ts) => ScanRecord::new(kind, data, ts),
        None => ScanRecord::now(kind, data),
    };
    Ok(HistoryJob::Append(record))
}

pub fn apply_loaded(state: &mut AppState, value: Result<LoadOutcome>) {
    state.history.job_finished();
    state.history.refreshing = false;
    match value {
        Ok(outcome) => {
            state.history.quarantined = outcome.quarantined.len();
            state.history.records = outcome.records;
        }
        Err(e) => warn!(error = %e, "could not load history"),
    }
}

pub fn apply_persisted(value: Result<()>) {
    if let Err(e) = value {
        error!(error = %e, "could not persist history");
    }
}

pub fn apply_cleared(state: &mut AppState, value: Result<()>) {
    state.history.job_finished();
    match value {
        Ok(()) => {
            state.history.records.clear();
            state.history.quarantined = 0;
        }
        Err(e) => error!(error = %e, "could not clear history"),
    }
}

pub fn apply_appended(state: &mut AppState, value: Result<Vec<ScanRecord>>) {
    state.history.job_finished();
    match value {
        Ok(records) => state.history.records = records,
        Err(e) => error!(error = %e, "could not append to history"),
    }
}

/// Local time in the `M/D/YYYY, h:mm:ss AM` form, or "Invalid Date".
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
        None => t!("history.invalid_date").into_owned(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-time forms without an offset are read as local time.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

pub fn caption(record: &ScanRecord) -> String {
    format!("{} • {}", record.kind, format_timestamp(&record.timestamp))
}

pub fn render_history_screen(state: &AppState) -> Value {
    let title = t!("history.title");
    let clear_all = t!("history.clear_all");
    let mut header = vec![to_value_or_text(
        UiText::new(&title).size(20.0),
        "history_title",
    )];
    if !state.history.records.is_empty() {
        header.push(to_value_or_text(
            UiButton::new(&clear_all, "history_clear")
                .id("history_clear_btn")
                .style("secondary"),
            "history_clear_btn",
        ));
    }

    let mut children = vec![
        tab_bar(Screen::History),
        to_value_or_text(UiRow::new(header).spacing(12), "history_header"),
    ];

    let items: Vec<Value> = if state.history.records.is_empty() {
        let empty = t!("history.empty");
        vec![to_value_or_text(
            UiText::new(&empty)
                .tone("muted")
                .content_description("history_empty"),
            "history_empty",
        )]
    } else {
        state
            .history
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| render_record_card(index, record))
            .collect()
    };

    children.push(to_value_or_text(
        UiVirtualList::new(items)
            .id("history_list")
            .estimated_item_height(132)
            .pull_to_refresh(state.history.refreshing, "history_refresh"),
        "history_list",
    ));

    push_last_error(&mut children, state);

    let mut root = to_value_or_text(
        UiColumn::new(children).padding(16).id("HistoryScreen"),
        "history_root",
    );
    if state.history.awaiting_result() {
        if let Some(obj) = root.as_object_mut() {
            obj.insert("auto_refresh_ms".into(), json!(POLL_INTERVAL_MS));
            obj.insert("auto_refresh_action".into(), json!("history_poll"));
        }
    }
    root
}

fn render_record_card(index: usize, record: &ScanRecord) -> Value {
    let primary_label = if is_web_url(&record.data) {
        t!("common.open_link")
    } else {
        t!("history.view")
    };
    let delete = t!("history.delete");
    let caption = caption(record);

    let actions = vec![
        to_value_or_text(
            UiButton::new(&primary_label, "history_open")
                .style("primary")
                .payload(json!({ "index": index })),
            "history_open_btn",
        ),
        to_value_or_text(
            UiButton::new(&delete, "history_delete")
                .style("danger")
                .payload(json!({ "index": index })),
            "history_delete_btn",
        ),
    ];

    to_value_or_text(
        UiCard::new(vec![
            to_value_or_text(
                UiText::new(&record.data)
                    .size(15.0)
                    .max_lines(PAYLOAD_MAX_LINES),
                "history_payload",
            ),
            to_value_or_text(
                UiText::new(&caption)
                    .size(12.0)
                    .tone("muted")
                    .content_description("history_caption"),
                "history_caption",
            ),
            to_value_or_text(UiRow::new(actions).spacing(10), "history_actions"),
        ])
        .padding(14)
        .content_description("history_card"),
        "history_card",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(kind: &str, data: &str) -> ScanRecord {
        ScanRecord::new(kind, data, "2024-01-01T00:00:00Z")
    }

    fn collect<'a>(node: &'a Value, key: &str, value: &str, out: &mut Vec<&'a Value>) {
        if node.get(key).and_then(|v| v.as_str()) == Some(value) {
            out.push(node);
        }
        if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
            for child in children {
                collect(child, key, value, out);
            }
        }
    }

    fn all_by<'a>(node: &'a Value, key: &str, value: &str) -> Vec<&'a Value> {
        let mut out = Vec::new();
        collect(node, key, value, &mut out);
        out
    }

    #[test]
    fn delete_updates_memory_and_persists_rest() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "a"), record("QR", "b"), record("QR", "c")];
        let job = handle_delete(&mut state, 1);
        let expected = vec![record("QR", "a"), record("QR", "c")];
        assert_eq!(state.history.records, expected);
        assert_eq!(job, HistoryJob::Persist(expected));
    }

    #[test]
    fn delete_out_of_range_still_writes_back() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "a")];
        let job = handle_delete(&mut state, 3);
        assert_eq!(job, HistoryJob::Persist(vec![record("QR", "a")]));
    }

    #[test]
    fn queued_load_sets_refreshing_until_applied() {
        let mut state = AppState::new();
        let job = enter_history(&mut state);
        assert_eq!(state.current_screen(), Screen::History);
        state.history.job_queued(&job);
        assert!(state.history.refreshing);
        assert!(state.history.awaiting_result());

        apply_loaded(
            &mut state,
            Ok(LoadOutcome {
                records: vec![record("QR", "x")],
                quarantined: vec![json!({"bad": 1})],
            }),
        );
        assert!(!state.history.refreshing);
        assert!(!state.history.awaiting_result());
        assert_eq!(state.history.records.len(), 1);
        assert_eq!(state.history.quarantined, 1);
    }

    #[test]
    fn failed_load_keeps_previous_list() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "kept")];
        state.history.job_queued(&HistoryJob::Load);
        apply_loaded(&mut state, Err(Error::NotAnArray { found: "object" }));
        assert_eq!(state.history.records, vec![record("QR", "kept")]);
        assert!(!state.history.refreshing);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn persist_does_not_hold_polling() {
        let mut state = AppState::new();
        state.history.job_queued(&HistoryJob::Persist(Vec::new()));
        assert!(!state.history.awaiting_result());
    }

    #[test]
    fn failed_clear_keeps_list() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "a")];
        state.history.job_queued(&HistoryJob::Clear);
        apply_cleared(&mut state, Err(Error::StorePoisoned));
        assert_eq!(state.history.records.len(), 1);
        apply_cleared(&mut state, Ok(()));
        assert!(state.history.records.is_empty());
    }

    #[test]
    fn clear_request_offers_cancel_and_destructive_clear() {
        let mut state = AppState::new();
        handle_clear_request(&mut state);
        let effects = state.take_effects();
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Alert { buttons, .. } => {
                let actions: Vec<_> = buttons.iter().map(|b| b.action.as_deref()).collect();
                assert_eq!(
                    actions,
                    vec![Some("history_clear_cancel"), Some("history_clear_confirm")]
                );
                assert_eq!(buttons[1].style, "destructive");
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[test]
    fn open_url_vs_raw_payload() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "https://example.com"), record("QR", "plain text")];

        handle_open(&mut state, 0);
        assert_eq!(
            state.take_effects(),
            vec![Effect::OpenUrl {
                url: "https://example.com".into()
            }]
        );

        handle_open(&mut state, 1);
        match state.take_effects().as_slice() {
            [Effect::Alert { message, .. }] => assert_eq!(message, "plain text"),
            other => panic!("expected alert, got {other:?}"),
        }

        handle_open(&mut state, 9);
        assert!(state.take_effects().is_empty());
    }

    #[test]
    fn append_requires_data() {
        assert!(handle_append(Some("QR".into()), None, None).is_err());
        let job = handle_append(
            Some("QR".into()),
            Some("x".into()),
            Some("2024-01-01T00:00:00Z".into()),
        )
        .unwrap();
        assert_eq!(job, HistoryJob::Append(record("QR", "x")));
    }

    #[test]
    fn timestamp_formats() {
        let formatted = format_timestamp("2024-06-15T12:30:45Z");
        assert!(formatted.contains("2024"));
        assert!(formatted.contains(':'));
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
        assert!(parse_timestamp("2024-06-15 12:30:45").is_some());
        assert!(parse_timestamp("2024-06-15T12:30:45.123").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn caption_joins_type_and_time() {
        let cap = caption(&record("QR", "x"));
        assert!(cap.starts_with("QR • "));
    }

    #[test]
    fn render_cards_and_actions() {
        let mut state = AppState::new();
        state.history.records = vec![record("QR", "https://example.com"), record("EAN_13", "123")];
        let ui = render_history_screen(&state);

        assert_eq!(all_by(&ui, "content_description", "history_card").len(), 2);
        let opens = all_by(&ui, "action", "history_open");
        assert_eq!(opens.len(), 2);
        assert_eq!(opens[1]["payload"]["index"], 1);
        assert_eq!(all_by(&ui, "action", "history_delete").len(), 2);
        assert_eq!(all_by(&ui, "action", "history_clear").len(), 1);

        let payloads = all_by(&ui, "text", "https://example.com");
        assert_eq!(payloads[0]["max_lines"], PAYLOAD_MAX_LINES);
        assert!(ui.get("auto_refresh_ms").is_none());
    }

    #[test]
    fn render_empty_state_hides_clear_all() {
        let state = AppState::new();
        let ui = render_history_screen(&state);
        assert_eq!(all_by(&ui, "content_description", "history_empty").len(), 1);
        assert!(all_by(&ui, "action", "history_clear").is_empty());
        let lists = all_by(&ui, "type", "VirtualList");
        let list = lists[0];
        assert_eq!(list["refreshing"], false);
        assert_eq!(list["refresh_action"], "history_refresh");
    }

    #[test]
    fn render_polls_while_waiting() {
        let mut state = AppState::new();
        state.history.job_queued(&HistoryJob::Load);
        let ui = render_history_screen(&state);
        assert_eq!(ui["auto_refresh_action"], "history_poll");
        assert_eq!(ui["auto_refresh_ms"], POLL_INTERVAL_MS);
    }
}
