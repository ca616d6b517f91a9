use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{RwLock, RwLockReadGuard},
    task::JoinHandle,
};
use tracing::Instrument;

use crate::{
    backend::{BackendError, QuoteBackend, Subscription},
    floating::Rotations,
    wall::WallView,
};

pub struct LiveState {
    pub view: WallView,
    pub rotations: Rotations,
}

/// A mounted wall: one task owns the subscription and the rotation timer and
/// is the only writer of the projection.
pub struct LiveWall {
    state: Arc<RwLock<LiveState>>,
    task: Option<JoinHandle<()>>,
}

impl LiveWall {
    #[tracing::instrument(skip_all)]
    pub async fn mount(
        backend: &dyn QuoteBackend,
        view: WallView,
        rotations: Rotations,
        rotation_interval: Duration,
    ) -> Result<Self, BackendError> {
        let subscription = backend
            .subscribe_all()
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when subscribing to quotes"))?;

        let state = Arc::new(RwLock::new(LiveState { view, rotations }));
        let task = tokio::spawn(
            drive(subscription, state.clone(), rotation_interval).in_current_span(),
        );

        tracing::info!("mounted live quote wall");

        Ok(LiveWall {
            state,
            task: Some(task),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, LiveState> {
        self.state.read().await
    }

    /// Stops the task and waits for it, so nothing touches the projection
    /// once this returns.
    pub async fn unmount(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }

        tracing::info!("unmounted live quote wall");
    }
}

impl Drop for LiveWall {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(mut subscription: Subscription, state: Arc<RwLock<LiveState>>, every: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);

    loop {
        tokio::select! {
            delivery = subscription.next() => {
                let Some(delivery) = delivery else {
                    tracing::warn!("quote subscription ended, the wall will no longer update");
                    break;
                };

                let mut state = state.write().await;
                if let Ok(snapshot) = &delivery {
                    state.rotations.resize(snapshot.len());
                }
                state.view.apply(delivery);
            }
            _ = ticker.tick() => {
                state.write().await.rotations.tick();
            }
        }
    }
}
