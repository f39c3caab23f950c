use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

/// A genuine failure of asynchronous item content. Aborts are not errors; see [`Settled`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("item content failed to load: {0}")]
    Failed(String),
    #[error("item source dropped before settling")]
    Dropped,
}

/// Outcome of a [`Deferred`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settled<T> {
    Ready(T),
    Failed(ItemError),
    Aborted,
}

impl<T> Settled<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Settled<U> {
        match self {
            Self::Ready(v) => Settled::Ready(f(v)),
            Self::Failed(e) => Settled::Failed(e),
            Self::Aborted => Settled::Aborted,
        }
    }
}

enum State<T> {
    Pending,
    Settled(Settled<T>),
    Taken,
}

struct Slot<T> {
    state: RefCell<State<T>>,
    waker: RefCell<Option<Waker>>,
}

impl<T> Slot<T> {
    fn settle(&self, outcome: Settled<T>) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, State::Pending) {
                return false;
            }
            *state = State::Settled(outcome);
        }
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
        true
    }
}

trait Source<T> {
    fn is_settled(&self) -> bool;
    /// Takes the outcome once settled; registers `waker` while pending.
    fn take(&mut self, waker: Option<&Waker>) -> Option<Settled<T>>;
    fn abort(&mut self) -> bool;
}

impl<T> Source<T> for Rc<Slot<T>> {
    fn is_settled(&self) -> bool {
        !matches!(*self.state.borrow(), State::Pending)
    }

    fn take(&mut self, waker: Option<&Waker>) -> Option<Settled<T>> {
        let mut state = self.state.borrow_mut();
        match core::mem::replace(&mut *state, State::Taken) {
            State::Settled(outcome) => Some(outcome),
            State::Pending => {
                *state = State::Pending;
                if let Some(waker) = waker {
                    *self.waker.borrow_mut() = Some(waker.clone());
                }
                None
            }
            State::Taken => None,
        }
    }

    fn abort(&mut self) -> bool {
        self.settle(Settled::Aborted)
    }
}

struct Mapped<T, U> {
    source: Box<dyn Source<T>>,
    f: Option<Box<dyn FnOnce(T) -> U>>,
}

impl<T, U> Source<U> for Mapped<T, U> {
    fn is_settled(&self) -> bool {
        self.source.is_settled()
    }

    fn take(&mut self, waker: Option<&Waker>) -> Option<Settled<U>> {
        let outcome = self.source.take(waker)?;
        Some(match (outcome, self.f.take()) {
            (Settled::Ready(v), Some(f)) => Settled::Ready(f(v)),
            (Settled::Ready(_), None) => Settled::Aborted,
            (Settled::Failed(e), _) => Settled::Failed(e),
            (Settled::Aborted, _) => Settled::Aborted,
        })
    }

    fn abort(&mut self) -> bool {
        self.source.abort()
    }
}

/// An abortable, single-threaded asynchronous value.
///
/// Poll it as a [`Future`] or check it with [`Self::try_take`]. The outcome is handed out once;
/// polling again afterwards stays pending forever.
///
/// [`Self::abort`] is idempotent and settles the source immediately with [`Settled::Aborted`],
/// so a later [`Resolver::resolve`] is ignored. Handles derived with [`Self::map`] abort their
/// source.
pub struct Deferred<T> {
    source: Box<dyn Source<T>>,
}

impl<T: 'static> Deferred<T> {
    /// An already resolved handle.
    pub fn ready(value: T) -> Self {
        Self::settled(Settled::Ready(value))
    }

    pub fn settled(outcome: Settled<T>) -> Self {
        Self {
            source: Box::new(Rc::new(Slot {
                state: RefCell::new(State::Settled(outcome)),
                waker: RefCell::new(None),
            })),
        }
    }

    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Deferred<U> {
        Deferred {
            source: Box::new(Mapped {
                source: self.source,
                f: Some(Box::new(f)),
            }),
        }
    }
}

impl<T> Deferred<T> {
    /// Returns `true` if this call aborted a pending source.
    pub fn abort(&mut self) -> bool {
        self.source.abort()
    }

    pub fn is_settled(&self) -> bool {
        self.source.is_settled()
    }

    pub fn try_take(&mut self) -> Option<Settled<T>> {
        self.source.take(None)
    }
}

impl<T> Future for Deferred<T> {
    type Output = Settled<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().source.take(Some(cx.waker())) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish_non_exhaustive()
    }
}

/// The producing half of a [`Deferred`].
///
/// Dropping it while the handle is still pending settles the handle with
/// [`ItemError::Dropped`].
pub struct Resolver<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Resolver<T> {
    /// Returns `false` if the handle was already aborted.
    pub fn resolve(self, value: T) -> bool {
        self.slot.settle(Settled::Ready(value))
    }

    pub fn reject(self, reason: impl Into<String>) -> bool {
        self.slot
            .settle(Settled::Failed(ItemError::Failed(reason.into())))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            *self.slot.state.borrow(),
            State::Settled(Settled::Aborted)
        )
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        self.slot.settle(Settled::Failed(ItemError::Dropped));
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Creates a pending handle and the resolver that settles it.
pub fn deferred<T: 'static>() -> (Resolver<T>, Deferred<T>) {
    let slot = Rc::new(Slot {
        state: RefCell::new(State::Pending),
        waker: RefCell::new(None),
    });
    (
        Resolver { slot: slot.clone() },
        Deferred {
            source: Box::new(slot),
        },
    )
}
