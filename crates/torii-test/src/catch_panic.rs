use pin_project_lite::pin_project;
use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    task::{Context, Poll},
    thread,
};

pin_project! {
    /// Future resolving to the panic payload instead of unwinding through the caller
    pub struct CatchPanic<F> {
        #[pin]
        inner: F,
        done: bool,
    }
}

impl<F> CatchPanic<F> {
    pub fn new(inner: F) -> Self {
        Self { inner, done: false }
    }
}

impl<F> Future for CatchPanic<F>
where
    F: Future,
{
    type Output = thread::Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        assert!(!*this.done, "CatchPanic polled after completion");

        let poll_result =
            match panic::catch_unwind(AssertUnwindSafe(|| this.inner.as_mut().poll(cx))) {
                Ok(Poll::Ready(out)) => Poll::Ready(Ok(out)),
                Ok(Poll::Pending) => Poll::Pending,
                Err(payload) => Poll::Ready(Err(payload)),
            };
        *this.done = poll_result.is_ready();

        poll_result
    }
}
