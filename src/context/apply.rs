//! Ambient context propagation across await points.

use super::node::Context;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// The context made ambient by the innermost enclosing [`ApplyContext`].
pub fn ambient() -> Option<Context> {
    CURRENT
        .try_with(|current| current.borrow().clone())
        .ok()
        .flatten()
}

/// Restores the previously ambient context when dropped, including on
/// unwind.
struct Restore(Option<Context>);

impl Drop for Restore {
    fn drop(&mut self) {
        let prior = self.0.take();
        let _ = CURRENT.try_with(|current| *current.borrow_mut() = prior);
    }
}

fn enter(context: Context) -> Restore {
    let prior = CURRENT
        .try_with(|current| current.borrow_mut().replace(context))
        .ok()
        .flatten();
    Restore(prior)
}

/// Makes `context` ambient while the wrapped future is polled.
///
/// The previously ambient context is restored after every poll, so the
/// wrapper is correct on executors that move tasks between threads.
pub struct ApplyContext<F> {
    context: Context,
    future: Pin<Box<F>>,
}

impl<F: Future> ApplyContext<F> {
    pub fn new(context: Context, future: F) -> Self {
        Self {
            context,
            future: Box::pin(future),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl<F: Future> Future for ApplyContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _restore = enter(this.context.clone());
        this.future.as_mut().poll(cx)
    }
}

/// Run `f` with `context` ambient.
pub fn with_context<R>(context: &Context, f: impl FnOnce() -> R) -> R {
    let _restore = enter(context.clone());
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ForkOptions, Settings};
    use crate::logging::{BaseLevels, MemorySink, Profile};
    use std::sync::Arc;

    fn root() -> Context {
        Context::root(
            "root",
            Settings::new(
                BaseLevels::default(),
                Profile::Development,
                Arc::new(MemorySink::new()),
            ),
        )
    }

    #[tokio::test]
    async fn wrapped_future_sees_its_context() {
        let root = root();
        let child = root.fork("child", ForkOptions::new().label("job"));

        let seen = ApplyContext::new(child.clone(), async { ambient() }).await;

        assert_eq!(seen, Some(child));
    }

    #[tokio::test]
    async fn context_is_restored_after_poll() {
        let root = root();
        let outer = root.fork("outer", ForkOptions::new());
        let inner = outer.fork("inner", ForkOptions::new());

        let (during, after) = ApplyContext::new(outer.clone(), async {
            let during = ApplyContext::new(inner.clone(), async { ambient() }).await;
            (during, ambient())
        })
        .await;

        assert_eq!(during, Some(inner));
        assert_eq!(after, Some(outer));
    }

    #[tokio::test]
    async fn context_survives_suspension() {
        let child = root().fork("child", ForkOptions::new());

        let seen = ApplyContext::new(child.clone(), async {
            tokio::task::yield_now().await;
            ambient()
        })
        .await;

        assert_eq!(seen, Some(child));
    }

    #[test]
    fn with_context_is_scoped() {
        let child = root().fork("child", ForkOptions::new());
        let before = ambient();
        let inside = with_context(&child, ambient);
        assert_eq!(inside, Some(child));
        assert_eq!(ambient(), before);
    }
}
