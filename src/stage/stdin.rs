//! Standard input for guest processes
//!
//! Programs read stdin a line at a time. Each request goes to an injected
//! [`InputProvider`] (in the browser, a line input) and is raced against a timer.
//! If the provider has no answer, or does not answer in time, the process gets
//! the configured default line instead of hanging the pipeline.

use super::timer::{Timer, with_deadline};
use crate::console_log;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Source of stdin lines
pub trait InputProvider {
    /// Ask for one line. `None` means no answer is available.
    fn request_line(&self) -> LocalBoxFuture<'static, Option<String>>;
}

/// Provider that never has input
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputProvider for NoInput {
    fn request_line(&self) -> LocalBoxFuture<'static, Option<String>> {
        Box::pin(async { None })
    }
}

/// Provider answering from a fixed queue of lines
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: RefCell<VecDeque<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: RefCell::new(lines.into_iter().map(Into::into).collect()),
        }
    }
}

impl InputProvider for ScriptedInput {
    fn request_line(&self) -> LocalBoxFuture<'static, Option<String>> {
        let line = self.lines.borrow_mut().pop_front();
        Box::pin(async move { line })
    }
}

/// How long to wait for input and what to answer when none comes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdinPolicy {
    pub timeout: Duration,
    pub default_response: String,
}

impl Default for StdinPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            default_response: String::new(),
        }
    }
}

/// Bounded bridge between a guest's stdin and an [`InputProvider`]
#[derive(Clone)]
pub struct StdinBridge {
    provider: Rc<dyn InputProvider>,
    timer: Rc<dyn Timer>,
    policy: Rc<StdinPolicy>,
}

impl StdinBridge {
    pub fn new(provider: Rc<dyn InputProvider>, timer: Rc<dyn Timer>, policy: StdinPolicy) -> Self {
        Self {
            provider,
            timer,
            policy: Rc::new(policy),
        }
    }

    pub fn policy(&self) -> &StdinPolicy {
        &self.policy
    }

    /// One newline-terminated line for the guest
    pub async fn read_line(&self) -> String {
        let answer = with_deadline(
            self.timer.as_ref(),
            Some(self.policy.timeout),
            self.provider.request_line(),
        )
        .await;

        let line = match answer {
            Ok(Some(line)) => line,
            Ok(None) => self.policy.default_response.clone(),
            Err(_) => {
                console_log!(
                    "[stage] No stdin after {} ms, using default",
                    self.policy.timeout.as_millis()
                );
                self.policy.default_response.clone()
            }
        };

        terminate_line(line)
    }
}

fn terminate_line(mut line: String) -> String {
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::timer::{NeverTimer, ThreadTimer};
    use futures::executor::block_on;
    use futures::future;

    struct SilentProvider;

    impl InputProvider for SilentProvider {
        fn request_line(&self) -> LocalBoxFuture<'static, Option<String>> {
            Box::pin(future::pending())
        }
    }

    #[test]
    fn test_scripted_lines_then_default() {
        let bridge = StdinBridge::new(
            Rc::new(ScriptedInput::new(["Ada"])),
            Rc::new(NeverTimer),
            StdinPolicy::default(),
        );
        assert_eq!(block_on(bridge.read_line()), "Ada\n");
        assert_eq!(block_on(bridge.read_line()), "\n");
    }

    #[test]
    fn test_no_input_uses_default_response() {
        let policy = StdinPolicy {
            timeout: Duration::from_secs(1),
            default_response: "y".into(),
        };
        let bridge = StdinBridge::new(Rc::new(NoInput), Rc::new(NeverTimer), policy);
        assert_eq!(block_on(bridge.read_line()), "y\n");
    }

    #[test]
    fn test_silent_provider_times_out() {
        let policy = StdinPolicy {
            timeout: Duration::from_millis(10),
            default_response: String::new(),
        };
        let bridge = StdinBridge::new(Rc::new(SilentProvider), Rc::new(ThreadTimer), policy);
        assert_eq!(block_on(bridge.read_line()), "\n");
    }

    #[test]
    fn test_existing_newline_kept() {
        assert_eq!(terminate_line("done\n".into()), "done\n");
    }
}
