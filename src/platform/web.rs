//! Browser glue
//!
//! Everything here talks to JavaScript:
//! - [`JsWasiHost`] hands modules to the page's WASI worker host
//! - [`LineInput`] answers stdin from a line input under the terminal
//! - [`load_config`] reads the embedded JSON config
//!
//! The worker host is not ours. The page must expose a global
//! `ScratchHost.start(url, context)` returning a promise:
//!
//! ```text
//! context = { args, env, fs, stdout(str), stderr(str), stdin() -> Promise<str>, signal }
//! resolve -> { exitCode, fs }
//! reject  -> Error (name "WASIWorkerHostKilledError" when the worker was killed)
//! ```
//!
//! `fs` uses the WASIFS shape: path -> `{ path, timestamps: { access, change,
//! modification }, mode: "string" | "binary", content }`.

use crate::config::IdeConfig;
use crate::console_log;
use crate::stage::{
    ExecutableModule, HostError, HostExit, HostOptions, InputProvider, OutputSink, WasiHost,
};
use crate::vfs::{Content, FileRecord, FsSnapshot, Timestamps};
use futures::channel::oneshot;
use futures::future::{self, Either, LocalBoxFuture};
use js_sys::{Array, Object, Reflect, Uint8Array};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlInputElement, KeyboardEvent};

/// Id of the `<script type="application/json">` element holding config
pub const CONFIG_ELEMENT_ID: &str = "scratchide-config";

/// Error name the worker host uses for a killed process
const KILLED_ERROR: &str = "WASIWorkerHostKilledError";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ScratchHost, js_name = start, catch)]
    fn host_start(binary_url: &str, context: &JsValue) -> Result<js_sys::Promise, JsValue>;
}

/// WASI host backed by the page's worker host
#[derive(Debug, Default, Clone, Copy)]
pub struct JsWasiHost;

impl WasiHost for JsWasiHost {
    fn start(
        &self,
        module: ExecutableModule,
        options: HostOptions,
    ) -> LocalBoxFuture<'static, Result<HostExit, HostError>> {
        Box::pin(run_module(module, options))
    }
}

async fn run_module(module: ExecutableModule, options: HostOptions) -> Result<HostExit, HostError> {
    let launch = |e: JsValue| HostError::Launch(describe(&e));

    let url = ModuleUrl::create(&module).map_err(launch)?;
    let mut abort = AbortOnDrop::new().map_err(launch)?;

    let stdout_sink = options.stdout.clone();
    let stdout = Closure::<dyn FnMut(String)>::new(move |s: String| stdout_sink.write(s.as_bytes()));
    let stderr_sink = options.stderr.clone();
    let stderr = Closure::<dyn FnMut(String)>::new(move |s: String| stderr_sink.write(s.as_bytes()));
    let bridge = options.stdin.clone();
    let stdin = Closure::<dyn FnMut() -> js_sys::Promise>::new(move || {
        let bridge = bridge.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            Ok(JsValue::from_str(&bridge.read_line().await))
        })
    });

    let context = Object::new();
    let args: Array = options.args.iter().map(|a| JsValue::from_str(a)).collect();
    Reflect::set(&context, &"args".into(), &args).map_err(launch)?;
    let env = Object::new();
    for (key, value) in &options.env {
        Reflect::set(&env, &key.into(), &value.into()).map_err(launch)?;
    }
    Reflect::set(&context, &"env".into(), &env).map_err(launch)?;
    Reflect::set(&context, &"fs".into(), &snapshot_to_js(&options.fs).map_err(launch)?)
        .map_err(launch)?;
    Reflect::set(&context, &"stdout".into(), stdout.as_ref()).map_err(launch)?;
    Reflect::set(&context, &"stderr".into(), stderr.as_ref()).map_err(launch)?;
    Reflect::set(&context, &"stdin".into(), stdin.as_ref()).map_err(launch)?;
    Reflect::set(&context, &"signal".into(), &abort.signal()).map_err(launch)?;

    let promise = host_start(url.as_str(), &context).map_err(launch)?;

    let finished = JsFuture::from(promise);
    let cancelled = options.cancel.cancelled();
    futures::pin_mut!(finished, cancelled);
    let settled = match future::select(finished, cancelled).await {
        Either::Left((settled, _)) => settled,
        // The host rejects with a killed error once it sees the abort
        Either::Right(((), finished)) => {
            abort.abort();
            finished.await
        }
    };
    abort.disarm();

    let value = settled.map_err(host_error)?;
    let exit_code = Reflect::get(&value, &"exitCode".into())
        .ok()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HostError::Launch("host result has no exitCode".into()))?;
    let fs = Reflect::get(&value, &"fs".into()).map_err(launch)?;
    let fs = snapshot_from_js(&fs).map_err(HostError::Launch)?;

    Ok(HostExit {
        exit_code: exit_code as i32,
        fs,
    })
}

fn host_error(err: JsValue) -> HostError {
    let name = Reflect::get(&err, &"name".into())
        .ok()
        .and_then(|n| n.as_string());
    if name.as_deref() == Some(KILLED_ERROR) {
        HostError::Killed(describe(&err))
    } else {
        HostError::Launch(describe(&err))
    }
}

fn describe(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// Blob URL for a module, revoked on drop
struct ModuleUrl(String);

impl ModuleUrl {
    fn create(module: &ExecutableModule) -> Result<Self, JsValue> {
        let parts = Array::of1(&Uint8Array::from(module.bytes()));
        let bag = web_sys::BlobPropertyBag::new();
        bag.set_type(module.mime_type());
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &bag)?;
        Ok(Self(web_sys::Url::create_object_url_with_blob(&blob)?))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for ModuleUrl {
    fn drop(&mut self) {
        let _ = web_sys::Url::revoke_object_url(&self.0);
    }
}

/// Aborts the host process if the future driving it is dropped early
///
/// The stage runner drops the host future on timeout or cancellation; this
/// is how the worker learns about it.
struct AbortOnDrop {
    controller: web_sys::AbortController,
    armed: bool,
}

impl AbortOnDrop {
    fn new() -> Result<Self, JsValue> {
        Ok(Self {
            controller: web_sys::AbortController::new()?,
            armed: true,
        })
    }

    fn signal(&self) -> web_sys::AbortSignal {
        self.controller.signal()
    }

    fn abort(&self) {
        self.controller.abort();
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abort();
        }
    }
}

/// Convert a snapshot to a WASIFS object
pub fn snapshot_to_js(snapshot: &FsSnapshot) -> Result<Object, JsValue> {
    let fs = Object::new();
    for record in snapshot {
        let entry = Object::new();
        Reflect::set(&entry, &"path".into(), &record.path().into())?;

        let stamps = record.timestamps();
        let timestamps = Object::new();
        Reflect::set(&timestamps, &"access".into(), &date(stamps.accessed))?;
        Reflect::set(&timestamps, &"change".into(), &date(stamps.changed))?;
        Reflect::set(&timestamps, &"modification".into(), &date(stamps.modified))?;
        Reflect::set(&entry, &"timestamps".into(), &timestamps)?;

        let (mode, content): (&str, JsValue) = match record.content() {
            Content::Text(text) => ("string", text.into()),
            Content::Binary(bytes) => ("binary", Uint8Array::from(bytes.as_slice()).into()),
        };
        Reflect::set(&entry, &"mode".into(), &mode.into())?;
        Reflect::set(&entry, &"content".into(), &content)?;

        Reflect::set(&fs, &record.path().into(), &entry)?;
    }
    Ok(fs)
}

/// Convert a WASIFS object back into a snapshot
pub fn snapshot_from_js(value: &JsValue) -> Result<FsSnapshot, String> {
    let object: &Object = value
        .dyn_ref()
        .ok_or_else(|| "host returned no filesystem".to_string())?;

    let mut records = Vec::new();
    for key in Object::keys(object).iter() {
        let entry = Reflect::get(object, &key).map_err(|e| describe(&e))?;
        let path = field(&entry, "path")
            .as_string()
            .or_else(|| key.as_string())
            .ok_or_else(|| "file entry without a path".to_string())?;

        let raw = field(&entry, "content");
        let content = match field(&entry, "mode").as_string().as_deref() {
            Some("string") => Content::Text(raw.as_string().unwrap_or_default()),
            _ => Content::Binary(Uint8Array::new(&raw).to_vec()),
        };

        let stamps = field(&entry, "timestamps");
        let timestamps = Timestamps {
            accessed: millis(&field(&stamps, "access")),
            changed: millis(&field(&stamps, "change")),
            modified: millis(&field(&stamps, "modification")),
        };

        records.push(FileRecord::new(path, content, timestamps).map_err(|e| e.to_string())?);
    }
    Ok(FsSnapshot::from_records(records))
}

fn field(value: &JsValue, name: &str) -> JsValue {
    Reflect::get(value, &name.into()).unwrap_or(JsValue::UNDEFINED)
}

fn date(ms: f64) -> JsValue {
    js_sys::Date::new(&JsValue::from_f64(ms)).into()
}

/// Dates or plain numbers, in milliseconds
fn millis(value: &JsValue) -> f64 {
    if let Some(date) = value.dyn_ref::<js_sys::Date>() {
        return date.get_time();
    }
    value.as_f64().unwrap_or(0.0)
}

type PendingSender = Rc<RefCell<Option<oneshot::Sender<String>>>>;

/// stdin typed into a line input
///
/// The field is enabled only while a program waits for a line, and Enter
/// answers the request. Nothing blocks the page: an unanswered request stays
/// pending until the stdin deadline gives up on it.
#[derive(Clone)]
pub struct LineInput {
    field: HtmlInputElement,
    pending: PendingSender,
}

impl LineInput {
    pub fn attach(field: HtmlInputElement) -> Result<Self, JsValue> {
        field.set_disabled(true);
        let pending = PendingSender::default();

        let on_key = Closure::<dyn FnMut(KeyboardEvent)>::new({
            let field = field.clone();
            let pending = pending.clone();
            move |event: KeyboardEvent| {
                if event.key() != "Enter" {
                    return;
                }
                event.prevent_default();
                if let Some(tx) = pending.borrow_mut().take() {
                    let _ = tx.send(field.value());
                }
                field.set_value("");
            }
        });
        field.add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())?;
        on_key.forget();

        Ok(Self { field, pending })
    }
}

impl InputProvider for LineInput {
    fn request_line(&self) -> LocalBoxFuture<'static, Option<String>> {
        let (tx, rx) = oneshot::channel();
        *self.pending.borrow_mut() = Some(tx);
        self.field.set_disabled(false);
        let _ = self.field.focus();

        let request = PendingLine {
            field: self.field.clone(),
            pending: self.pending.clone(),
        };
        Box::pin(async move {
            let _request = request;
            rx.await.ok()
        })
    }
}

/// Closes the field when a request is answered, times out or is dropped
struct PendingLine {
    field: HtmlInputElement,
    pending: PendingSender,
}

impl Drop for PendingLine {
    fn drop(&mut self) {
        self.pending.borrow_mut().take();
        self.field.set_disabled(true);
    }
}

/// Config from the page, or defaults
pub fn load_config() -> IdeConfig {
    let json = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|e| e.text_content());

    let Some(json) = json else {
        return IdeConfig::default();
    };

    match IdeConfig::from_json(&json) {
        Ok(config) => config,
        Err(e) => {
            console_log!("[boot] {}; using defaults", e);
            IdeConfig::default()
        }
    }
}
