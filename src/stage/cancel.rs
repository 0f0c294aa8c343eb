//! Cancellation
//!
//! A [`CancelToken`] is handed to the WASI host with every stage so the host
//! can tear the process down, and the runner wraps the host's future in
//! [`Cancellable`] so it stops waiting the moment the token fires.

use futures::channel::oneshot;
use futures::future::{self, FutureExt, Shared};
use pin_project_lite::pin_project;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

struct Inner {
    cancelled: Cell<bool>,
    trigger: RefCell<Option<oneshot::Sender<()>>>,
    signal: Shared<oneshot::Receiver<()>>,
}

/// Shared, single-shot cancellation flag
///
/// Clones observe the same flag. Cancelling twice is a no-op.
#[derive(Clone)]
pub struct CancelToken {
    inner: Rc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            inner: Rc::new(Inner {
                cancelled: Cell::new(false),
                trigger: RefCell::new(Some(tx)),
                signal: rx.shared(),
            }),
        }
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        if let Some(tx) = self.inner.trigger.borrow_mut().take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub fn cancelled(&self) -> impl Future<Output = ()> + 'static {
        let signal = self.inner.signal.clone();
        async move {
            if signal.await.is_err() {
                // Every token dropped without cancelling
                future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Returned by [`Cancellable`] when the token fired first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

pin_project! {
    /// Future that gives up as soon as its token is cancelled
    pub struct Cancellable<F> {
        #[pin]
        future: F,
        signal: future::LocalBoxFuture<'static, ()>,
        token: CancelToken,
    }
}

impl<F> Cancellable<F> {
    pub fn new(future: F, token: &CancelToken) -> Self {
        Self {
            future,
            signal: token.cancelled().boxed_local(),
            token: token.clone(),
        }
    }
}

impl<F: Future> Future for Cancellable<F> {
    type Output = Result<F::Output, Cancelled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // Check cancellation first so a cancelled stage never makes progress
        if this.token.is_cancelled() || this.signal.poll_unpin(cx).is_ready() {
            return Poll::Ready(Err(Cancelled));
        }

        match this.future.poll(cx) {
            Poll::Ready(out) => Poll::Ready(Ok(out)),
            Poll::Pending => Poll::Pending,
        }
    }
}
