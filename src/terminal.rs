//! Terminal output
//!
//! Guest processes write raw bytes, and a multi-byte character can be split
//! across two writes. [`TerminalSink`] decodes incrementally and holds back an
//! incomplete tail until the rest arrives, so the screen only ever sees whole
//! characters. Bytes that can never become valid UTF-8 are shown as U+FFFD.
//!
//! In the browser the screen is xterm.js, bound directly through
//! `wasm_bindgen` to the global `Terminal` class loaded by a script tag.

use crate::stage::OutputSink;
use std::cell::RefCell;

/// Anything that displays text
pub trait Screen {
    fn write_text(&self, text: &str);
    fn clear(&self);
}

/// Streams process output onto a [`Screen`]
pub struct TerminalSink<S: Screen> {
    screen: S,
    pending: RefCell<Vec<u8>>,
}

impl<S: Screen> TerminalSink<S> {
    pub fn new(screen: S) -> Self {
        Self {
            screen,
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    /// Emit whatever is held back, even if incomplete
    pub fn flush(&self) {
        let rest = std::mem::take(&mut *self.pending.borrow_mut());
        if !rest.is_empty() {
            self.screen.write_text(&String::from_utf8_lossy(&rest));
        }
    }

    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
        self.screen.clear();
    }
}

impl<S: Screen> OutputSink for TerminalSink<S> {
    fn write(&self, bytes: &[u8]) {
        let mut pending = self.pending.borrow_mut();
        pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut rest: &[u8] = &pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix decodes
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let keep = rest.to_vec();
        *pending = keep;
        drop(pending);

        if !text.is_empty() {
            self.screen.write_text(&text);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::XTermScreen;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::Screen;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    // Direct bindings to xterm.js globals (loaded via script tag)
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = Terminal)]
        type XTerm;

        #[wasm_bindgen(constructor, js_class = "Terminal")]
        fn new(options: &JsValue) -> XTerm;

        #[wasm_bindgen(method)]
        fn open(this: &XTerm, element: &web_sys::HtmlElement);

        #[wasm_bindgen(method)]
        fn write(this: &XTerm, data: &str);

        #[wasm_bindgen(method)]
        fn clear(this: &XTerm);

        #[wasm_bindgen(method, js_name = loadAddon)]
        fn load_addon(this: &XTerm, addon: &JsValue);

        /// The xterm-addon-fit FitAddon class (global `FitAddon`)
        #[wasm_bindgen(js_name = FitAddon)]
        type XTermFitAddon;

        #[wasm_bindgen(constructor, js_class = "FitAddon")]
        fn new_fit() -> XTermFitAddon;

        #[wasm_bindgen(method)]
        fn fit(this: &XTermFitAddon);
    }

    /// xterm.js instance mounted in a container element
    pub struct XTermScreen {
        terminal: XTerm,
        fit: XTermFitAddon,
    }

    impl XTermScreen {
        /// Open a terminal inside `container`
        pub fn open(container: &web_sys::HtmlElement) -> Result<Self, JsValue> {
            let options = js_sys::Object::new();
            // Programs print bare \n
            js_sys::Reflect::set(&options, &"convertEol".into(), &true.into())?;
            js_sys::Reflect::set(&options, &"fontSize".into(), &14.into())?;
            js_sys::Reflect::set(
                &options,
                &"fontFamily".into(),
                &"'JetBrains Mono', 'Fira Code', monospace".into(),
            )?;
            js_sys::Reflect::set(&options, &"disableStdin".into(), &true.into())?;

            let terminal = XTerm::new(&options.into());
            terminal.open(container);

            let fit = XTermFitAddon::new_fit();
            terminal.load_addon(fit.unchecked_ref());
            fit.fit();

            Ok(Self { terminal, fit })
        }

        /// Resize to the container
        pub fn fit(&self) {
            self.fit.fit();
        }
    }

    impl Screen for XTermScreen {
        fn write_text(&self, text: &str) {
            self.terminal.write(text);
        }

        fn clear(&self) {
            self.terminal.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TextScreen {
        text: RefCell<String>,
        writes: RefCell<usize>,
    }

    impl Screen for TextScreen {
        fn write_text(&self, text: &str) {
            self.text.borrow_mut().push_str(text);
            *self.writes.borrow_mut() += 1;
        }

        fn clear(&self) {
            self.text.borrow_mut().clear();
        }
    }

    #[test]
    fn test_plain_ascii() {
        let sink = TerminalSink::new(TextScreen::default());
        sink.write(b"Hello, ");
        sink.write(b"world!\n");
        assert_eq!(*sink.screen().text.borrow(), "Hello, world!\n");
    }

    #[test]
    fn test_split_multibyte_character() {
        let sink = TerminalSink::new(TextScreen::default());
        let bytes = "héllo".as_bytes();
        // 'é' is two bytes; split between them
        sink.write(&bytes[..2]);
        assert_eq!(*sink.screen().text.borrow(), "h");
        sink.write(&bytes[2..]);
        assert_eq!(*sink.screen().text.borrow(), "héllo");
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let sink = TerminalSink::new(TextScreen::default());
        sink.write(&[b'a', 0xFF, b'b']);
        assert_eq!(*sink.screen().text.borrow(), "a\u{FFFD}b");
    }

    #[test]
    fn test_flush_incomplete_tail() {
        let sink = TerminalSink::new(TextScreen::default());
        sink.write(&[b'x', 0xE2, 0x82]);
        assert_eq!(*sink.screen().text.borrow(), "x");
        sink.flush();
        assert_eq!(*sink.screen().text.borrow(), "x\u{FFFD}");
    }

    #[test]
    fn test_empty_write_does_not_touch_screen() {
        let sink = TerminalSink::new(TextScreen::default());
        sink.write(&[]);
        assert_eq!(*sink.screen().writes.borrow(), 0);
    }

    #[test]
    fn test_clear() {
        let sink = TerminalSink::new(TextScreen::default());
        sink.write(&[b'a', 0xE2]);
        sink.clear();
        sink.write(b"b");
        assert_eq!(*sink.screen().text.borrow(), "b");
    }
}
