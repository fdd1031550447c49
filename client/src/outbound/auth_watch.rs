//! Shared auth state broadcasting for identity adapters.
//!
//! Every subscriber owns an unbounded queue, so each published transition
//! reaches each subscriber in publish order, however slowly it drains.

use std::sync::{Mutex, MutexGuard};

use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::domain::AuthState;
use crate::domain::ports::AuthStateStream;

#[derive(Debug)]
struct Subscribers {
    current: AuthState,
    queues: Vec<mpsc::UnboundedSender<AuthState>>,
}

/// Latest auth state plus its subscribers.
#[derive(Debug)]
pub(crate) struct AuthBroadcast {
    inner: Mutex<Subscribers>,
}

impl AuthBroadcast {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Subscribers {
                current: AuthState::SignedOut,
                queues: Vec::new(),
            }),
        }
    }

    pub(crate) fn current(&self) -> AuthState {
        self.lock().current.clone()
    }

    /// Publish `state`; subscribers are only woken when it differs.
    ///
    /// Queues whose stream has been dropped are pruned here.
    pub(crate) fn publish(&self, state: AuthState) {
        let mut inner = self.lock();
        if inner.current == state {
            return;
        }
        inner.current = state.clone();
        inner
            .queues
            .retain(|queue| queue.send(state.clone()).is_ok());
    }

    /// Stream the current state, then every later transition.
    pub(crate) fn subscribe(&self) -> AuthStateStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut inner = self.lock();
            // Queued under the lock so no publish can slip in ahead of it.
            if sender.send(inner.current.clone()).is_ok() {
                inner.queues.push(sender);
            }
        }
        stream::unfold(receiver, |mut receiver| async move {
            let state = receiver.recv().await?;
            Some((state, receiver))
        })
        .boxed()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
