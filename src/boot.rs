//! Boot sequence
//!
//! Builds the page and wires it to the pipeline:
//!
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │ main.cpp   │        [Run!]  [Stop]        │
//! │ test.txt   ├──────────────────────────────┤
//! │            │ textarea (selected file)     │
//! │ Add new    ├──────────────────────────────┤
//! │ file...    │ terminal                     │
//! │            │ stdin line                   │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! Everything lives on the UI thread; a run is spawned with `spawn_local`
//! and the pipeline itself rejects overlapping runs.

use crate::archive::ArchiveLoader;
use crate::console_log;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::pipeline::{Pipeline, PipelineError, RunOutcome};
use crate::platform::web::{JsWasiHost, LineInput, load_config};
use crate::stage::{BrowserTimer, OutputSink, StageRunner, StdinBridge, Timer};
use crate::terminal::{TerminalSink, XTermScreen};
use crate::workspace::Workspace;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlTextAreaElement,
};

const FILE_ATTR: &str = "data-file";

thread_local! {
    static APP: RefCell<Option<Rc<App>>> = const { RefCell::new(None) };
}

struct App {
    workspace: RefCell<Workspace>,
    pipeline: Pipeline,
    terminal: Rc<TerminalSink<XTermScreen>>,
    document: Document,
    file_list: Element,
    editor: HtmlTextAreaElement,
    run_button: HtmlButtonElement,
}

/// Build the UI and start listening
pub fn boot() -> Result<(), JsValue> {
    let config = load_config();
    console_log!("[boot] Toolchain from {}", config.compiler_url());

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let body = document.body().ok_or("no body")?;

    let root = element(&document, "div", "display:flex;height:100vh;margin:0")?;
    let sidebar = element(&document, "div", "width:25%;background:#edf2f7;padding:16px")?;
    let file_list = element(&document, "div", "display:flex;flex-direction:column;gap:8px")?;
    let add_button: HtmlButtonElement = element(&document, "button", "margin-top:16px")?.dyn_into()?;
    add_button.set_text_content(Some("Add new file..."));
    sidebar.append_child(&file_list)?;
    sidebar.append_child(&add_button)?;

    let main = element(&document, "div", "width:75%;padding:16px;display:flex;flex-direction:column")?;
    let toolbar = element(&document, "div", "display:flex;justify-content:center;gap:8px;margin:16px 0")?;
    let run_button: HtmlButtonElement = element(&document, "button", "")?.dyn_into()?;
    run_button.set_text_content(Some("Run!"));
    let stop_button: HtmlButtonElement = element(&document, "button", "")?.dyn_into()?;
    stop_button.set_text_content(Some("Stop"));
    toolbar.append_child(&run_button)?;
    toolbar.append_child(&stop_button)?;

    let editor: HtmlTextAreaElement = element(
        &document,
        "textarea",
        "flex:7;font-family:monospace;resize:none;margin-bottom:16px",
    )?
    .dyn_into()?;
    editor.set_placeholder("Write your C++ code here...");
    let term_container: HtmlElement = element(&document, "div", "flex:1")?.dyn_into()?;
    let stdin_field: HtmlInputElement =
        element(&document, "input", "font-family:monospace;margin-top:8px")?.dyn_into()?;
    stdin_field.set_placeholder("stdin (Enter to send)");

    main.append_child(&toolbar)?;
    main.append_child(&editor)?;
    main.append_child(&term_container)?;
    main.append_child(&stdin_field)?;
    root.append_child(&sidebar)?;
    root.append_child(&main)?;
    body.append_child(&root)?;

    let terminal = Rc::new(TerminalSink::new(XTermScreen::open(&term_container)?));

    let fetcher: Rc<dyn Fetcher> = Rc::new(HttpFetcher::new());
    let timer: Rc<dyn Timer> = Rc::new(BrowserTimer);
    let input = LineInput::attach(stdin_field)?;
    let stdin = StdinBridge::new(Rc::new(input), timer.clone(), config.stdin_policy());
    let runner = StageRunner::new(Rc::new(JsWasiHost), fetcher.clone(), timer, stdin);
    let pipeline = Pipeline::new(config, runner, ArchiveLoader::new(fetcher));

    let app = Rc::new(App {
        workspace: RefCell::new(Workspace::new()),
        pipeline,
        terminal,
        document,
        file_list,
        editor,
        run_button,
    });

    app.render_files()?;
    app.load_editor();

    on(&app.file_list, "click", {
        let app = app.clone();
        move |event: web_sys::Event| {
            let name = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|e| e.get_attribute(FILE_ATTR));
            if let Some(name) = name {
                app.select(&name);
            }
        }
    })?;

    on(&add_button, "click", {
        let app = app.clone();
        move |_| app.add_file()
    })?;

    on(&app.editor, "input", {
        let app = app.clone();
        move |_| {
            let content = app.editor.value();
            app.workspace.borrow_mut().update_selected(&content);
        }
    })?;

    on(&app.run_button, "click", {
        let app = app.clone();
        move |_| wasm_bindgen_futures::spawn_local(app.clone().run())
    })?;

    on(&stop_button, "click", {
        let app = app.clone();
        move |_| app.pipeline.cancel()
    })?;

    on(&window, "resize", {
        let app = app.clone();
        move |_| app.terminal.screen().fit()
    })?;

    APP.with(|a| *a.borrow_mut() = Some(app));
    console_log!("[boot] Ready");
    Ok(())
}

impl App {
    fn render_files(&self) -> Result<(), JsValue> {
        self.file_list.set_inner_html("");
        let workspace = self.workspace.borrow();
        for name in workspace.files().names() {
            let button: HtmlButtonElement = element(&self.document, "button", "")?.dyn_into()?;
            button.set_text_content(Some(name));
            button.set_attribute(FILE_ATTR, name)?;
            button.set_disabled(name == workspace.selected());
            self.file_list.append_child(&button)?;
        }
        Ok(())
    }

    fn load_editor(&self) {
        let content = self.workspace.borrow().selected_content().to_string();
        self.editor.set_value(&content);
    }

    fn refresh(&self) {
        if let Err(e) = self.render_files() {
            web_sys::console::error_1(&e);
        }
        self.load_editor();
    }

    fn select(&self, name: &str) {
        let selected = self.workspace.borrow_mut().select(name);
        match selected {
            Ok(()) => self.refresh(),
            Err(e) => console_log!("[workspace] {}", e),
        }
    }

    fn add_file(&self) {
        let Some(name) = web_sys::window()
            .and_then(|w| w.prompt_with_message("File Name: ").ok())
            .flatten()
        else {
            return;
        };

        let added = self.workspace.borrow_mut().add_file(&name);
        match added {
            Ok(()) => self.refresh(),
            Err(e) => console_log!("[workspace] {}", e),
        }
    }

    async fn run(self: Rc<Self>) {
        // Snapshot of the files as they were when Run was pressed
        let project = self.workspace.borrow().files().clone();
        self.run_button.set_disabled(true);

        let output: Rc<dyn OutputSink> = self.terminal.clone();
        match self.pipeline.run(&project, output).await {
            Ok(report) => match report.outcome {
                RunOutcome::Succeeded => console_log!("[boot] Run succeeded"),
                RunOutcome::Failed { stage, exit_code } => {
                    console_log!("[boot] {} exited with {}", stage, exit_code)
                }
            },
            Err(PipelineError::RunAlreadyInProgress) => return,
            Err(e) => console_log!("[boot] Run failed: {}", e),
        }

        self.terminal.flush();
        self.terminal.write(b"\n");
        self.run_button.set_disabled(false);
    }
}

fn element(document: &Document, tag: &str, style: &str) -> Result<Element, JsValue> {
    let el = document.create_element(tag)?;
    if !style.is_empty() {
        el.set_attribute("style", style)?;
    }
    Ok(el)
}

/// Attach a listener for the page's lifetime
fn on(
    target: &web_sys::EventTarget,
    event: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
