//! Live views over the help request collection.
//!
//! A `LiveViews` value holds two independent live queries, one for pending and
//! one for resolved requests. Running it renders each pane's current set and
//! then re-renders a pane with its full result set whenever the store pushes a
//! new one. Both subscriptions are released when the run ends, however it ends.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::core::{HelpRequest, RequestStatus};
use crate::error::{HelpdeskError, Result};
use crate::store::{LiveQuery, RequestStore};

/// Draws one pane of the live views.
pub trait ViewRenderer: Send {
    /// Replace the pane for `status` with `requests`.
    fn render(&mut self, status: RequestStatus, requests: &[HelpRequest]) -> Result<()>;
}

/// The pending and resolved panes, subscribed but not yet running.
#[derive(Debug)]
pub struct LiveViews {
    pending: LiveQuery,
    resolved: LiveQuery,
}

impl LiveViews {
    /// Open both subscriptions against `store`.
    pub fn open<S: RequestStore + ?Sized>(store: &S) -> Self {
        Self {
            pending: store.subscribe(RequestStatus::Pending),
            resolved: store.subscribe(RequestStatus::Resolved),
        }
    }

    /// Render until `shutdown` completes, the renderer fails, or the store
    /// goes away.
    pub async fn run<R, F>(self, renderer: &mut R, shutdown: F) -> Result<()>
    where
        R: ViewRenderer + ?Sized,
        F: Future<Output = ()>,
    {
        let LiveViews {
            mut pending,
            mut resolved,
        } = self;
        tokio::pin!(shutdown);

        renderer.render(RequestStatus::Pending, &pending.current())?;
        renderer.render(RequestStatus::Resolved, &resolved.current())?;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                set = pending.next() => match set {
                    Some(set) => renderer.render(RequestStatus::Pending, &set)?,
                    None => break,
                },
                set = resolved.next() => match set {
                    Some(set) => renderer.render(RequestStatus::Resolved, &set)?,
                    None => break,
                },
            }
        }

        tracing::debug!("live views closed");
        Ok(())
    }

    /// Run on a background task.
    pub fn spawn<R: ViewRenderer + 'static>(self, mut renderer: R) -> LiveViewHandle {
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let stop = async move {
                let _ = shutdown_rx.await;
            };
            self.run(&mut renderer, stop).await
        });
        LiveViewHandle { shutdown, task }
    }
}

/// A running pair of live views.
#[derive(Debug)]
pub struct LiveViewHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl LiveViewHandle {
    /// Whether rendering has stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop rendering and release both subscriptions.
    ///
    /// The renderer is not called again once this returns. Returns the
    /// renderer's error if it stopped the views earlier.
    pub async fn close(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|err| HelpdeskError::render(format!("live views task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NewHelpRequest, RequestPatch};
    use crate::store::MemoryStore;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Renders = Arc<Mutex<Vec<(RequestStatus, Vec<String>)>>>;

    /// Renderer that records every pane it is asked to draw.
    #[derive(Default, Clone)]
    struct RecordingRenderer {
        renders: Renders,
        fail_after: Option<usize>,
    }

    impl ViewRenderer for RecordingRenderer {
        fn render(&mut self, status: RequestStatus, requests: &[HelpRequest]) -> Result<()> {
            let mut renders = self.renders.lock().unwrap();
            if self.fail_after.is_some_and(|n| renders.len() >= n) {
                return Err(HelpdeskError::render("terminal closed"));
            }
            renders.push((status, requests.iter().map(|r| r.id.clone()).collect()));
            Ok(())
        }
    }

    fn last_render(renders: &Renders, status: RequestStatus) -> Option<Vec<String>> {
        renders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| *s == status)
            .map(|(_, ids)| ids.clone())
    }

    async fn wait_until(renders: &Renders, done: impl Fn(&Renders) -> bool) {
        for _ in 0..200 {
            if done(renders) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("views never reached the expected state: {:?}", renders.lock().unwrap());
    }

    #[tokio::test]
    async fn test_resolution_moves_request_between_panes() {
        let store = Arc::new(MemoryStore::new());
        let request = store
            .create(NewHelpRequest::new("cust", "Do you deliver?"))
            .unwrap();

        let renderer = RecordingRenderer::default();
        let renders = Arc::clone(&renderer.renders);
        let handle = LiveViews::open(&store).spawn(renderer);

        wait_until(&renders, |r| r.lock().unwrap().len() >= 2).await;
        assert_eq!(
            last_render(&renders, RequestStatus::Pending),
            Some(vec![request.id.clone()])
        );
        assert_eq!(last_render(&renders, RequestStatus::Resolved), Some(vec![]));

        store
            .update(&request.id, &RequestPatch::resolve("Within 5 miles"))
            .unwrap();

        let id = request.id.clone();
        wait_until(&renders, move |r| {
            last_render(r, RequestStatus::Pending) == Some(vec![])
                && last_render(r, RequestStatus::Resolved) == Some(vec![id.clone()])
        })
        .await;

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_releases_subscriptions() {
        let store = Arc::new(MemoryStore::new());
        let handle = LiveViews::open(&store).spawn(RecordingRenderer::default());
        assert_eq!(store.active_subscriptions(RequestStatus::Pending), 1);
        assert_eq!(store.active_subscriptions(RequestStatus::Resolved), 1);

        handle.close().await.unwrap();
        assert_eq!(store.active_subscriptions(RequestStatus::Pending), 0);
        assert_eq!(store.active_subscriptions(RequestStatus::Resolved), 0);
    }

    #[tokio::test]
    async fn test_no_render_after_close() {
        let store = Arc::new(MemoryStore::new());
        let renderer = RecordingRenderer::default();
        let renders = Arc::clone(&renderer.renders);
        let handle = LiveViews::open(&store).spawn(renderer);

        handle.close().await.unwrap();
        let seen = renders.lock().unwrap().len();

        store
            .create(NewHelpRequest::new("cust", "Are you open late?"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(renders.lock().unwrap().len(), seen);
    }

    #[tokio::test]
    async fn test_renderer_error_ends_run_and_releases() {
        let store = MemoryStore::new();
        let mut renderer = RecordingRenderer {
            fail_after: Some(1),
            ..Default::default()
        };

        let result = LiveViews::open(&store)
            .run(&mut renderer, std::future::pending())
            .await;

        assert!(result.is_err());
        assert_eq!(renderer.renders.lock().unwrap().len(), 1);
        assert_eq!(store.active_subscriptions(RequestStatus::Pending), 0);
        assert_eq!(store.active_subscriptions(RequestStatus::Resolved), 0);
    }

    #[tokio::test]
    async fn test_run_ends_when_store_is_dropped() {
        let store = MemoryStore::new();
        let views = LiveViews::open(&store);
        drop(store);

        let mut renderer = RecordingRenderer::default();
        views
            .run(&mut renderer, std::future::pending())
            .await
            .unwrap();
        assert_eq!(renderer.renders.lock().unwrap().len(), 2);
    }
}
