//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the process-wide collection stores, notice queue and auth driver.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Collection items cross the boundary as JSON objects.
//! - At most one auth driver runs per process.

use dashstate_core::config::ENV_BASE_URL;
use dashstate_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AuthSession, AuthSyncConfig, AuthSyncHandle, AuthSynchronizer, CollectionAction,
    CollectionFeature, CollectionStore, HttpAuthTransport, ItemId, NoOpReason, NoticeKind,
    NoticeQueue, Record, RedirectQueue, ReduceOutcome, SortDirection, VerifyTrigger, Visibility,
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::runtime::{Builder, Runtime};

type StoreMap = HashMap<CollectionFeature, CollectionStore<Record>>;

static STORES: OnceLock<Mutex<StoreMap>> = OnceLock::new();
static NOTICES: OnceLock<Arc<NoticeQueue>> = OnceLock::new();
static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();
static AUTH: Mutex<Option<AuthBridge>> = Mutex::new(None);

/// Running auth driver plus the navigator the UI drains.
struct AuthBridge {
    handle: AuthSyncHandle,
    navigator: Arc<RedirectQueue>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Collection state envelope returned by every collection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResponse {
    /// Whether the request was understood. A no-op is still `ok`.
    pub ok: bool,
    /// `changed|duplicate|unchanged:<reason>|seeded|snapshot|invalid`.
    pub outcome: String,
    /// Current collection as a JSON array, after the call.
    pub items_json: String,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Pending user-visible notice (rendered as a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeItem {
    pub feature: String,
    pub kind: String,
    pub item_id: String,
    pub message: String,
}

/// Flattened auth session for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSessionView {
    /// `unknown|checking|authenticated|unauthenticated`.
    pub phase: String,
    pub authenticated: bool,
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub last_checked_at_ms: Option<i64>,
    pub last_failure: Option<String>,
    pub applied_sequence: u64,
}

/// Generic action response envelope for auth calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthActionResponse {
    pub ok: bool,
    pub message: String,
}

impl AuthActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Wire shape of `collection_dispatch` actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ActionRequest {
    Add {
        item: Value,
        #[serde(default)]
        insert_at_start: bool,
    },
    Remove {
        #[serde(default)]
        id: Option<Value>,
    },
    Edit {
        #[serde(default)]
        id: Option<Value>,
        item: Value,
        #[serde(default)]
        move_to_start: bool,
    },
    Sort {
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        direction: Option<String>,
    },
}

/// Replaces a feature's collection with a JSON array of objects.
///
/// # FFI contract
/// - Rejects non-array input, non-object items, missing and duplicate ids.
/// - On rejection the previous state is kept.
#[flutter_rust_bridge::frb(sync)]
pub fn collection_seed(feature: String, items_json: String) -> CollectionResponse {
    let Some(feature) = CollectionFeature::parse(&feature) else {
        return invalid_feature(&feature);
    };
    let seed = match parse_seed(&items_json) {
        Ok(seed) => seed,
        Err(message) => {
            return with_store(feature, |store| respond(store, false, "invalid", message));
        }
    };
    with_store(feature, |store| match store.reset(seed) {
        Ok(()) => {
            let message = format!("Seeded {} item(s).", store.items().len());
            respond(store, true, "seeded", message)
        }
        Err(err) => respond(
            store,
            false,
            "invalid",
            format!("collection_seed failed: {err}"),
        ),
    })
}

/// Applies one action to a feature's collection.
///
/// `action_json` is an object tagged by `type`:
/// `add{item, insert_at_start?}`, `remove{id}`,
/// `edit{id, item, move_to_start?}`, `sort{field, direction}`.
///
/// # FFI contract
/// - Never panics; a malformed action is reported, not applied.
/// - A duplicate add queues exactly one notice for `take_notices`.
#[flutter_rust_bridge::frb(sync)]
pub fn collection_dispatch(feature: String, action_json: String) -> CollectionResponse {
    let Some(feature) = CollectionFeature::parse(&feature) else {
        return invalid_feature(&feature);
    };
    let action = match parse_action(&action_json) {
        Ok(action) => action,
        Err(message) => {
            return with_store(feature, |store| respond(store, false, "invalid", message));
        }
    };
    with_store(feature, |store| {
        let outcome = store.dispatch(action);
        let message = outcome_message(&outcome);
        respond(store, true, &outcome_label(&outcome), message)
    })
}

/// Returns a feature's current collection.
#[flutter_rust_bridge::frb(sync)]
pub fn collection_snapshot(feature: String) -> CollectionResponse {
    let Some(feature) = CollectionFeature::parse(&feature) else {
        return invalid_feature(&feature);
    };
    with_store(feature, |store| {
        let message = format!("{} item(s).", store.items().len());
        respond(store, true, "snapshot", message)
    })
}

/// Drains pending notices in raise order.
#[flutter_rust_bridge::frb(sync)]
pub fn take_notices() -> Vec<NoticeItem> {
    notice_queue()
        .drain()
        .into_iter()
        .map(|notice| {
            let (kind, item_id) = match &notice.kind {
                NoticeKind::Duplicate { id } => ("duplicate", id.to_string()),
            };
            NoticeItem {
                feature: notice.feature.as_str().to_string(),
                kind: kind.to_string(),
                item_id,
                message: notice.message,
            }
        })
        .collect()
}

/// Starts the auth synchronizer against `base_url`.
///
/// Timing and ordering settings come from `DASHSTATE_*` environment
/// variables when present, defaults otherwise.
///
/// # FFI contract
/// - Fails when a driver is already running; call `auth_stop` first.
/// - When `visible`, one verification starts immediately.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_start(base_url: String, current_route: String, visible: bool) -> AuthActionResponse {
    let config = match auth_config(&base_url) {
        Ok(config) => config,
        Err(message) => return AuthActionResponse::failure(message),
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(message) => return AuthActionResponse::failure(message),
    };
    let mut slot = auth_slot();
    if slot.is_some() {
        return AuthActionResponse::failure("auth_start failed: synchronizer already running");
    }
    let transport = match HttpAuthTransport::new(&config) {
        Ok(transport) => Arc::new(transport),
        Err(err) => return AuthActionResponse::failure(format!("auth_start failed: {err}")),
    };

    let navigator = Arc::new(RedirectQueue::new(current_route.trim()));
    let synchronizer = Arc::new(AuthSynchronizer::new(
        &config,
        transport,
        navigator.clone(),
    ));
    let initial = if visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    let handle = {
        let _context = runtime.enter();
        AuthSyncHandle::start(synchronizer, &config, initial)
    };
    *slot = Some(AuthBridge { handle, navigator });
    AuthActionResponse::success("Auth synchronizer started.")
}

/// Returns the current session, or `None` when not started.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_session() -> Option<AuthSessionView> {
    auth_slot()
        .as_ref()
        .map(|bridge| session_view(&bridge.handle.snapshot()))
}

/// Reports a foreground/background transition of the app shell.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_set_visible(visible: bool) -> AuthActionResponse {
    with_auth(|bridge| {
        bridge.handle.set_visibility(if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        });
        AuthActionResponse::success("Visibility updated.")
    })
}

/// Tells the synchronizer which route the UI shows now.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_set_route(route: String) -> AuthActionResponse {
    with_auth(|bridge| {
        bridge.navigator.set_current_route(route.trim());
        AuthActionResponse::success("Route updated.")
    })
}

/// Runs one verification and blocks until it is applied.
///
/// # FFI contract
/// - Blocking call; bounded by the configured request timeout.
/// - Returns `None` when the synchronizer is not running.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_verify_now() -> Option<AuthSessionView> {
    let runtime = runtime().ok()?;
    let synchronizer = auth_slot()
        .as_ref()
        .map(|bridge| Arc::clone(bridge.handle.synchronizer()))?;
    let session = runtime.block_on(synchronizer.verify(VerifyTrigger::Manual));
    Some(session_view(&session))
}

/// Logs out remotely and clears the local session.
///
/// `ok` reports whether the remote acknowledged; the local session is
/// cleared either way.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_logout() -> AuthActionResponse {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(message) => return AuthActionResponse::failure(message),
    };
    let Some(synchronizer) = auth_slot()
        .as_ref()
        .map(|bridge| Arc::clone(bridge.handle.synchronizer()))
    else {
        return not_running();
    };
    let outcome = runtime.block_on(synchronizer.logout());
    if outcome.remote_acknowledged {
        AuthActionResponse::success("Logged out.")
    } else {
        AuthActionResponse::failure("Logged out locally; remote logout failed.")
    }
}

/// Pops the oldest pending redirect the UI should follow.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_take_redirect() -> Option<String> {
    auth_slot()
        .as_ref()
        .and_then(|bridge| bridge.navigator.take_redirect())
}

/// Stops the driver and releases its timer and in-flight requests.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_stop() -> AuthActionResponse {
    let Some(bridge) = auth_slot().take() else {
        return not_running();
    };
    match runtime() {
        Ok(runtime) => runtime.block_on(bridge.handle.shutdown()),
        // Dropping the handle aborts the driver.
        Err(_) => drop(bridge),
    }
    info!("event=auth_bridge_stop module=ffi status=ok");
    AuthActionResponse::success("Auth synchronizer stopped.")
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("dashstate-auth")
                .enable_all()
                .build()
                .map_err(|err| {
                    warn!("event=runtime_init module=ffi status=error");
                    format!("runtime init failed: {err}")
                })
        })
        .as_ref()
        .map_err(Clone::clone)
}

fn auth_config(base_url: &str) -> Result<AuthSyncConfig, String> {
    let base_url = base_url.to_string();
    AuthSyncConfig::from_lookup(|key| {
        if key == ENV_BASE_URL {
            Some(base_url.clone())
        } else {
            std::env::var(key).ok()
        }
    })
    .map_err(|err| format!("auth_start failed: {err}"))
}

fn auth_slot() -> MutexGuard<'static, Option<AuthBridge>> {
    AUTH.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_auth(f: impl FnOnce(&AuthBridge) -> AuthActionResponse) -> AuthActionResponse {
    match auth_slot().as_ref() {
        Some(bridge) => f(bridge),
        None => not_running(),
    }
}

fn not_running() -> AuthActionResponse {
    AuthActionResponse::failure("auth synchronizer is not running")
}

fn session_view(session: &AuthSession) -> AuthSessionView {
    let user = session.user();
    AuthSessionView {
        phase: session.phase().as_str().to_string(),
        authenticated: session.is_authenticated(),
        user_id: user.map(|user| user.user_id),
        display_name: user.and_then(|user| user.display_name.clone()),
        last_checked_at_ms: session.last_checked_at_ms(),
        last_failure: session.last_failure().map(ToString::to_string),
        applied_sequence: session.applied_sequence(),
    }
}

fn notice_queue() -> Arc<NoticeQueue> {
    NOTICES
        .get_or_init(|| Arc::new(NoticeQueue::new()))
        .clone()
}

fn with_store<R>(
    feature: CollectionFeature,
    f: impl FnOnce(&mut CollectionStore<Record>) -> R,
) -> R {
    let stores = STORES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut stores = stores
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let store = stores
        .entry(feature)
        .or_insert_with(|| CollectionStore::with_sink(feature, notice_queue()));
    f(store)
}

fn respond(
    store: &CollectionStore<Record>,
    ok: bool,
    outcome: &str,
    message: impl Into<String>,
) -> CollectionResponse {
    let items_json = serde_json::to_string(&store.snapshot()).unwrap_or_else(|_| "[]".to_string());
    CollectionResponse {
        ok,
        outcome: outcome.to_string(),
        items_json,
        message: message.into(),
    }
}

fn invalid_feature(feature: &str) -> CollectionResponse {
    CollectionResponse {
        ok: false,
        outcome: "invalid".to_string(),
        items_json: "[]".to_string(),
        message: format!("unknown feature: {feature}"),
    }
}

fn parse_seed(items_json: &str) -> Result<Vec<Record>, String> {
    let value: Value = serde_json::from_str(items_json)
        .map_err(|err| format!("collection_seed failed: invalid JSON: {err}"))?;
    let Value::Array(items) = value else {
        return Err("collection_seed failed: expected a JSON array".to_string());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            Record::from_value(item)
                .ok_or_else(|| format!("collection_seed failed: item {index} is not an object"))
        })
        .collect()
}

fn parse_action(action_json: &str) -> Result<CollectionAction<Record>, String> {
    let request: ActionRequest = serde_json::from_str(action_json)
        .map_err(|err| format!("collection_dispatch failed: invalid action: {err}"))?;
    let record = |item: Value| {
        Record::from_value(item)
            .ok_or_else(|| "collection_dispatch failed: item must be a JSON object".to_string())
    };
    let id = |id: Option<Value>| id.as_ref().and_then(ItemId::from_json);

    Ok(match request {
        ActionRequest::Add {
            item,
            insert_at_start,
        } => CollectionAction::Add {
            item: record(item)?,
            insert_at_start,
        },
        ActionRequest::Remove { id: target } => CollectionAction::Remove { id: id(target) },
        ActionRequest::Edit {
            id: target,
            item,
            move_to_start,
        } => CollectionAction::Edit {
            id: id(target),
            item: record(item)?,
            move_to_start,
        },
        ActionRequest::Sort { field, direction } => CollectionAction::Sort {
            field,
            direction: direction.as_deref().and_then(SortDirection::parse),
        },
    })
}

fn outcome_label(outcome: &ReduceOutcome) -> String {
    match outcome {
        ReduceOutcome::Changed => "changed".to_string(),
        ReduceOutcome::Duplicate(_) => "duplicate".to_string(),
        ReduceOutcome::Unchanged(reason) => format!("unchanged:{}", reason_label(*reason)),
    }
}

fn reason_label(reason: NoOpReason) -> &'static str {
    match reason {
        NoOpReason::MissingId => "missing_id",
        NoOpReason::MissingSortInput => "missing_sort_input",
        NoOpReason::NotFound => "not_found",
        NoOpReason::IdConflict => "id_conflict",
        NoOpReason::AlreadyOrdered => "already_ordered",
    }
}

fn outcome_message(outcome: &ReduceOutcome) -> String {
    match outcome {
        ReduceOutcome::Changed => "Collection updated.".to_string(),
        ReduceOutcome::Duplicate(id) => format!("Item {id} already exists."),
        ReduceOutcome::Unchanged(_) => "No change.".to_string(),
    }
}
