//! Timers
//!
//! The pipeline has no async runtime of its own, so sleeping is a seam:
//! the browser uses `setTimeout`, native builds park a helper thread. Either
//! way the sleep resolves through a oneshot channel and wakes whoever awaits it.

use futures::channel::oneshot;
use futures::future::{self, Either, LocalBoxFuture};
use std::future::Future;
use std::time::Duration;

/// Something that can produce a future resolving after `duration`
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Error returned when a deadline passes first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline elapsed")
    }
}

impl std::error::Error for Elapsed {}

/// Race `fut` against a sleep of `limit`
///
/// With no limit the future simply runs to completion.
pub async fn with_deadline<F: Future>(
    timer: &dyn Timer,
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, Elapsed> {
    let Some(limit) = limit else {
        return Ok(fut.await);
    };

    let fut = std::pin::pin!(fut);
    match future::select(fut, timer.sleep(limit)).await {
        Either::Left((out, _)) => Ok(out),
        Either::Right(((), _)) => Err(Elapsed),
    }
}

/// Native timer: one short-lived thread per sleep
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimer;

#[cfg(not(target_arch = "wasm32"))]
impl Timer for ThreadTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            std::thread::sleep(duration);
            let _ = tx.send(());
        });
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

/// Browser timer backed by `setTimeout`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTimer;

#[cfg(target_arch = "wasm32")]
impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::prelude::*;

        let (tx, rx) = oneshot::channel();
        let callback = Closure::once_into_js(move || {
            let _ = tx.send(());
        });

        let scheduled = web_sys::window().and_then(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref::<js_sys::Function>(),
                duration.as_millis().min(i32::MAX as u128) as i32,
            )
            .ok()
        });

        Box::pin(async move {
            if scheduled.is_some() {
                let _ = rx.await;
            }
        })
    }
}

/// Timer that never fires; deadlines under it never elapse
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverTimer;

impl Timer for NeverTimer {
    fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(future::pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_deadline_not_reached() {
        let out = block_on(with_deadline(&ThreadTimer, Some(Duration::from_secs(5)), async { 7 }));
        assert_eq!(out, Ok(7));
    }

    #[test]
    fn test_deadline_elapses() {
        let out = block_on(with_deadline(
            &ThreadTimer,
            Some(Duration::from_millis(10)),
            future::pending::<()>(),
        ));
        assert_eq!(out, Err(Elapsed));
    }

    #[test]
    fn test_no_limit_runs_to_completion() {
        let out = block_on(with_deadline(&NeverTimer, None, async { "done" }));
        assert_eq!(out, Ok("done"));
    }
}
