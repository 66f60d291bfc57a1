use crate::config::StoreConfig;
use crate::features::frame_decode::{decode_luma_frame, DecodedCode};
use crate::features::history::{
    self, apply_appended, apply_cleared, apply_loaded, apply_persisted, render_history_screen,
    HistoryJob,
};
use crate::features::history_store::{HistoryRepository, LoadOutcome, ScanRecord};
use crate::features::kv_store::{KeyValueStore, MemoryStore, SqliteStore};
use crate::features::scanner::{
    enter_scanner, handle_decoded, handle_open_link, handle_permission, render_scanner_screen,
};
use crate::i18n::update_locale;
use crate::logging::init_logging;
use crate::state::{AppState, Screen};
use crate::error;

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jint, jstring};
use jni::JNIEnv;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    ptr,
    sync::{mpsc, Arc, Mutex, MutexGuard, OnceLock},
    thread,
};
use tracing::{debug, info, warn};

#[cfg(test)]
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

struct GlobalState {
    ui: Mutex<AppState>,
    store: Mutex<Option<Arc<dyn KeyValueStore>>>,
    worker: OnceLock<WorkerRuntime>,
    notifications: Mutex<Vec<WorkerResult>>,
}

impl GlobalState {
    const fn new() -> Self {
        Self {
            ui: Mutex::new(AppState::new()),
            store: Mutex::new(None),
            worker: OnceLock::new(),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// A poisoned lock still holds usable state; the flag lets the caller
    /// report it.
    fn ui_lock(&self) -> (MutexGuard<'_, AppState>, bool) {
        match self.ui.lock() {
            Ok(guard) => (guard, false),
            Err(poisoned) => (poisoned.into_inner(), true),
        }
    }

    fn worker(&self) -> &WorkerRuntime {
        self.worker.get_or_init(WorkerRuntime::new)
    }

    fn configure_store(&self, config: &StoreConfig) {
        let path = config.database_path();
        let store: Arc<dyn KeyValueStore> = match SqliteStore::open(&path) {
            Ok(store) => {
                info!(path = %path.display(), "history store ready");
                Arc::new(store)
            }
            Err(e) => {
                warn!(error = %e, "falling back to in-memory history store");
                Arc::new(MemoryStore::new())
            }
        };
        self.install_store(store);
    }

    fn install_store(&self, store: Arc<dyn KeyValueStore>) {
        *lock_recovered(&self.store) = Some(store);
    }

    fn has_store(&self) -> bool {
        lock_recovered(&self.store).is_some()
    }

    /// The configured store, opening the default location on first use.
    fn store(&self) -> Arc<dyn KeyValueStore> {
        if !self.has_store() {
            self.configure_store(&StoreConfig::from_host(None));
        }
        let slot = lock_recovered(&self.store);
        match slot.as_ref() {
            Some(store) => Arc::clone(store),
            None => Arc::new(MemoryStore::new()),
        }
    }

    fn push_worker_result(&self, result: WorkerResult) {
        lock_recovered(&self.notifications).push(result);
    }

    fn drain_worker_results(&self) -> Vec<WorkerResult> {
        lock_recovered(&self.notifications).drain(..).collect()
    }
}

/// Results and the store slot stay valid after a panicking holder, so a
/// poisoned lock is taken over instead of dropping work.
fn lock_recovered<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Single background thread running storage jobs in FIFO order.
struct WorkerRuntime {
    sender: Option<mpsc::Sender<WorkerJob>>,
}

impl WorkerRuntime {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel::<WorkerJob>();
        let spawned = thread::Builder::new()
            .name("skanni-worker".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let result = run_worker_job(job);
                    STATE.push_worker_result(result);
                }
            });

        match spawned {
            Ok(_) => Self { sender: Some(tx) },
            Err(e) => {
                warn!(error = %e, "worker thread unavailable; running storage jobs inline");
                Self { sender: None }
            }
        }
    }

    fn enqueue(&self, job: WorkerJob) {
        #[cfg(test)]
        let sender = if TEST_FORCE_ASYNC_WORKER.load(Ordering::SeqCst) {
            self.sender.as_ref()
        } else {
            None
        };
        #[cfg(not(test))]
        let sender = self.sender.as_ref();

        let job = match sender {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                Err(mpsc::SendError(job)) => {
                    let err = error::Error::WorkerSend("channel closed".into());
                    warn!(error = %err, "running storage job inline");
                    job
                }
            },
            None => job,
        };
        STATE.push_worker_result(run_worker_job(job));
    }
}

struct WorkerJob {
    store: Arc<dyn KeyValueStore>,
    job: HistoryJob,
}

enum WorkerResult {
    Loaded(error::Result<LoadOutcome>),
    Persisted(error::Result<()>),
    Cleared(error::Result<()>),
    Appended(error::Result<Vec<ScanRecord>>),
}

fn run_worker_job(job: WorkerJob) -> WorkerResult {
    test_worker_delay();
    let repo = HistoryRepository::new(job.store);
    match job.job {
        HistoryJob::Load => WorkerResult::Loaded(repo.load()),
        HistoryJob::Persist(records) => WorkerResult::Persisted(repo.save(&records)),
        HistoryJob::Clear => WorkerResult::Cleared(repo.clear()),
        HistoryJob::Append(record) => WorkerResult::Appended(repo.append(record)),
    }
}

static STATE: GlobalState = GlobalState::new();

#[cfg(test)]
static TEST_FORCE_ASYNC_WORKER: AtomicBool = AtomicBool::new(false);

#[cfg(test)]
static TEST_WORKER_DELAY_MS: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
fn test_worker_delay() {
    let delay = TEST_WORKER_DELAY_MS.load(Ordering::SeqCst);
    if delay > 0 {
        thread::sleep(Duration::from_millis(delay));
    }
}

#[cfg(not(test))]
fn test_worker_delay() {}

#[derive(Deserialize, Default)]
struct Command {
    action: String,
    data: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<String>,
    index: Option<usize>,
    status: Option<String>,
    data_dir: Option<String>,
    locale: Option<String>,
    error: Option<String>,
    bindings: Option<HashMap<String, String>>,
}

#[derive(Debug)]
enum Action {
    Init {
        data_dir: Option<String>,
        locale: Option<String>,
    },
    Reset,
    ScannerScreen,
    HistoryScreen,
    ScannerPermission {
        status: Option<String>,
    },
    ScannerDecoded {
        kind: String,
        data: String,
    },
    ScannerReset,
    ScannerOpenLink,
    HistoryRefresh,
    HistoryPoll,
    HistoryDelete {
        index: usize,
    },
    HistoryOpen {
        index: usize,
    },
    HistoryClear,
    HistoryClearConfirm,
    HistoryClearCancel,
    HistoryAppend {
        kind: Option<String>,
        data: Option<String>,
        timestamp: Option<String>,
    },
    SetLocale {
        locale: String,
    },
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        data,
        kind,
        timestamp,
        index,
        status,
        data_dir,
        locale,
        error: host_error,
        bindings,
    } = command;

    let bindings = bindings.unwrap_or_default();
    let index = index.or_else(|| parse_usize_binding(&bindings, "index"));
    let data = data.or_else(|| bindings.get("data").cloned());
    let kind = kind.or_else(|| bindings.get("type").cloned());

    match action.as_str() {
        "init" => Ok(Action::Init { data_dir, locale }),
        "reset" => Ok(Action::Reset),
        "scanner_screen" => Ok(Action::ScannerScreen),
        "history_screen" => Ok(Action::HistoryScreen),
        "scanner_permission" => Ok(Action::ScannerPermission { status }),
        "scanner_decoded" => {
            let data = data.ok_or_else(|| "scanner_decoded_missing_data".to_string())?;
            Ok(Action::ScannerDecoded {
                kind: kind.unwrap_or_else(|| "unknown".into()),
                data,
            })
        }
        "scanner_reset" => Ok(Action::ScannerReset),
        "scanner_open_link" => Ok(Action::ScannerOpenLink),
        "history_refresh" => Ok(Action::HistoryRefresh),
        "history_poll" => Ok(Action::HistoryPoll),
        "history_delete" => index
            .map(|index| Action::HistoryDelete { index })
            .ok_or_else(|| "history_delete_missing_index".to_string()),
        "history_open" => index
            .map(|index| Action::HistoryOpen { index })
            .ok_or_else(|| "history_open_missing_index".to_string()),
        "history_clear" => Ok(Action::HistoryClear),
        "history_clear_confirm" => Ok(Action::HistoryClearConfirm),
        "history_clear_cancel" => Ok(Action::HistoryClearCancel),
        "history_append" => Ok(Action::HistoryAppend {
            kind,
            data,
            timestamp,
        }),
        "set_locale" => Ok(Action::SetLocale {
            locale: locale.unwrap_or_default(),
        }),
        other => Err(host_error.unwrap_or_else(|| format!("unknown_action:{other}"))),
    }
}

fn parse_usize_binding(bindings: &HashMap<String, String>, key: &str) -> Option<usize> {
    bindings.get(key).and_then(|v| v.trim().parse().ok())
}

/// Handle one JSON command and return the JSON UI tree for the host.
pub fn dispatch_json(input: &str) -> String {
    let response = std::panic::catch_unwind(|| {
        let command: Command = serde_json::from_str(input).unwrap_or_else(|e| Command {
            action: "error".into(),
            error: Some(format!("invalid_json:{e}")),
            ..Command::default()
        });
        handle_command(command)
    });
    match response {
        Ok(value) => value.to_string(),
        Err(_) => error_ui("panic").to_string(),
    }
}

#[no_mangle]
pub extern "system" fn Java_aeska_skanni_MainActivity_dispatch(
    mut env: JNIEnv,
    _class: JClass,
    input: JString,
) -> jstring {
    let input_str: String = env
        .get_string(&input)
        .map(|s| s.into())
        .unwrap_or_else(|_| "{}".to_string());

    let output_string = dispatch_json(&input_str);
    match env.new_string(output_string) {
        Ok(java_str) => java_str.into_raw(),
        Err(_) => {
            let fallback = error_ui("jni_new_string_failed").to_string();
            env.new_string(fallback)
                .map(|s| s.into_raw())
                .unwrap_or(ptr::null_mut())
        }
    }
}

/// Decode a camera luma frame. Returns the updated UI when the frame held a
/// barcode the scanner accepted, null otherwise.
#[no_mangle]
pub extern "system" fn Java_aeska_skanni_MainActivity_processQrCameraFrame(
    env: JNIEnv,
    _class: JClass,
    luma_array: JByteArray,
    width: jint,
    height: jint,
    row_stride: jint,
    rotation_deg: jint,
) -> jstring {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let luma_data = env
            .convert_byte_array(&luma_array)
            .map_err(|e| format!("jni_luma_array_err:{e}"))?;
        let decoded = decode_luma_frame(
            &luma_data,
            width.max(0) as u32,
            height.max(0) as u32,
            row_stride.max(0) as u32,
            rotation_deg.rem_euclid(360) as u16,
        )
        .map_err(|e| e.to_string())?;

        match decoded.and_then(handle_frame_decoded) {
            Some(ui) => env
                .new_string(ui.to_string())
                .map(|s| s.into_raw())
                .map_err(|e| format!("jni_new_string_err:{e}")),
            None => Ok(ptr::null_mut()),
        }
    }));

    match response {
        Ok(Ok(res)) => res,
        Ok(Err(e)) => {
            warn!(error = %e, "camera frame dropped");
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

fn handle_frame_decoded(code: DecodedCode) -> Option<Value> {
    let (mut state, _) = STATE.ui_lock();
    apply_worker_results(&mut state);
    if !state.scanner.is_accepting() {
        return None;
    }
    handle_decoded(&mut state, &code.kind, &code.data);
    Some(render_response(&mut state))
}

fn handle_command(command: Command) -> Value {
    let (mut state, lock_poisoned) = STATE.ui_lock();

    apply_worker_results(&mut state);
    state.ensure_navigation();

    let action = match parse_action(command) {
        Ok(action) => action,
        Err(err) => {
            warn!(error = %err, "rejected command");
            state.last_error = Some(err);
            return render_response(&mut state);
        }
    };
    debug!(?action, "dispatch");
    state.last_error = None;

    match action {
        Action::Init { data_dir, locale } => {
            init_logging();
            if data_dir.is_some() || !STATE.has_store() {
                STATE.configure_store(&StoreConfig::from_host(data_dir.as_deref()));
            }
            if let Some(locale) = locale {
                update_locale(&mut state, &locale);
            }
            match state.current_screen() {
                Screen::Scanner => enter_scanner(&mut state),
                Screen::History => {
                    let job = history::enter_history(&mut state);
                    queue_history_job(&mut state, job);
                }
            }
        }
        Action::Reset => {
            state.reset_runtime();
            state.reset_navigation();
            enter_scanner(&mut state);
        }
        Action::ScannerScreen => enter_scanner(&mut state),
        Action::HistoryScreen => {
            let job = history::enter_history(&mut state);
            queue_history_job(&mut state, job);
        }
        Action::ScannerPermission { status } => {
            handle_permission(&mut state, status.as_deref());
        }
        Action::ScannerDecoded { kind, data } => {
            if !handle_decoded(&mut state, &kind, &data) {
                debug!("decode callback ignored");
            }
        }
        Action::ScannerReset => state.scanner.reset(),
        Action::ScannerOpenLink => handle_open_link(&mut state),
        Action::HistoryRefresh => queue_history_job(&mut state, HistoryJob::Load),
        Action::HistoryPoll => {}
        Action::HistoryDelete { index } => {
            let job = history::handle_delete(&mut state, index);
            queue_history_job(&mut state, job);
        }
        Action::HistoryOpen { index } => history::handle_open(&mut state, index),
        Action::HistoryClear => history::handle_clear_request(&mut state),
        Action::HistoryClearConfirm => queue_history_job(&mut state, HistoryJob::Clear),
        Action::HistoryClearCancel => {}
        Action::HistoryAppend {
            kind,
            data,
            timestamp,
        } => match history::handle_append(kind, data, timestamp) {
            Ok(job) => queue_history_job(&mut state, job),
            Err(e) => state.last_error = Some(e),
        },
        Action::SetLocale { locale } => update_locale(&mut state, &locale),
    }

    apply_worker_results(&mut state);

    if lock_poisoned && state.last_error.is_none() {
        state.last_error = Some("state_poisoned".into());
    }

    render_response(&mut state)
}

fn queue_history_job(state: &mut AppState, job: HistoryJob) {
    state.history.job_queued(&job);
    let store = STATE.store();
    STATE.worker().enqueue(WorkerJob { store, job });
}

fn apply_worker_results(state: &mut AppState) {
    for result in STATE.drain_worker_results() {
        match result {
            WorkerResult::Loaded(value) => apply_loaded(state, value),
            WorkerResult::Persisted(value) => apply_persisted(value),
            WorkerResult::Cleared(value) => apply_cleared(state, value),
            WorkerResult::Appended(value) => apply_appended(state, value),
        }
    }
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

fn render_ui(state: &AppState) -> Value {
    match state.current_screen() {
        Screen::Scanner => render_scanner_screen(state),
        Screen::History => render_history_screen(state),
    }
}

/// Render the current screen and hand over pending effects.
fn render_response(state: &mut AppState) -> Value {
    let mut ui = render_ui(state);
    let effects = state.take_effects();
    if !effects.is_empty() {
        if let Some(obj) = ui.as_object_mut() {
            obj.insert(
                "effects".into(),
                serde_json::to_value(effects).unwrap_or_else(|_| json!([])),
            );
        }
    }
    ui
}
