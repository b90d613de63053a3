use crate::api::AuditApi;
use crate::channel::{EventChannel, Subscription};
use crate::config::WatchConfig;
use crate::dispatcher::{Completion, Dispatcher, Effect, WatchSnapshot};
use crate::events::{EventEnvelope, WatchEvent};
use crate::model::RepoId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Message {
    Event(EventEnvelope),
    Completed(Completion),
    StartSync,
    LoadMore,
    Refresh,
    /// Answered once every message queued before it has been handled.
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

/// Live view of one repository. Events, user commands and fetch completions
/// are handled one at a time on a single task; fetches run concurrently and
/// report back through the same queue.
///
/// Must be opened from within a tokio runtime.
pub struct WatchSession {
    tx: mpsc::UnboundedSender<Message>,
    snapshot_rx: watch::Receiver<WatchSnapshot>,
    subscription: Option<Subscription>,
    task: Option<JoinHandle<()>>,
}

impl WatchSession {
    pub fn open(
        api: Arc<dyn AuditApi>,
        channel: &dyn EventChannel,
        subject: impl Into<RepoId>,
        config: &WatchConfig,
    ) -> Self {
        let mut dispatcher = Dispatcher::new(subject, config.page_limit, config.notice_capacity);
        info!(repo_id = %dispatcher.subject(), "Opening watch session");
        let initial = dispatcher.open();
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(dispatcher.snapshot());

        let event_tx = tx.clone();
        let subscription = channel.subscribe(Arc::new(move |envelope: EventEnvelope| {
            let _ = event_tx.send(Message::Event(envelope));
        }));

        let task = tokio::spawn(run_loop(
            dispatcher,
            api,
            rx,
            tx.clone(),
            snapshot_tx,
            initial,
        ));
        Self {
            tx,
            snapshot_rx,
            subscription: Some(subscription),
            task: Some(task),
        }
    }

    pub fn start_sync(&self) {
        let _ = self.tx.send(Message::StartSync);
    }

    pub fn load_more(&self) {
        let _ = self.tx.send(Message::LoadMore);
    }

    pub fn refresh(&self) {
        let _ = self.tx.send(Message::Refresh);
    }

    pub fn snapshot(&self) -> WatchSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every state change.
    pub fn watch(&self) -> watch::Receiver<WatchSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Waits until everything queued so far has been handled and no fetch or
    /// sync request is outstanding. Returns false if `timeout` elapsed first
    /// or the session has stopped.
    pub async fn settled(&self, timeout: Duration) -> bool {
        let mut rx = self.watch();
        let tx = self.tx.clone();
        let wait = async move {
            let (ack_tx, ack_rx) = oneshot::channel();
            if tx.send(Message::Barrier(ack_tx)).is_err() || ack_rx.await.is_err() {
                return false;
            }
            rx.wait_for(|snapshot| !snapshot.busy).await.is_ok()
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    /// Unregisters from the event channel and stops the dispatch task.
    /// Fetches still in flight finish on their own and are discarded.
    pub async fn shutdown(mut self) {
        self.release();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(error = %err, "Watch session task ended abnormally");
        }
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            let _ = self.tx.send(Message::Shutdown);
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.release();
    }
}

async fn run_loop(
    mut dispatcher: Dispatcher,
    api: Arc<dyn AuditApi>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    tx: mpsc::UnboundedSender<Message>,
    snapshot_tx: watch::Sender<WatchSnapshot>,
    initial: Vec<Effect>,
) {
    spawn_effects(&api, &tx, initial);
    publish(&snapshot_tx, &dispatcher);

    while let Some(message) = rx.recv().await {
        let effects = match message {
            Message::Event(envelope) => match WatchEvent::decode(&envelope) {
                Ok(event) => {
                    debug!(kind = event.kind(), "Routing event");
                    dispatcher.dispatch(event)
                }
                Err(err) => {
                    warn!(error = %err, "Ignoring malformed event");
                    continue;
                }
            },
            Message::Completed(completion) => dispatcher.complete(completion),
            Message::StartSync => dispatcher.start_sync(),
            Message::LoadMore => dispatcher.load_more(),
            Message::Refresh => dispatcher.refresh(),
            Message::Barrier(ack) => {
                let _ = ack.send(());
                continue;
            }
            Message::Shutdown => break,
        };
        spawn_effects(&api, &tx, effects);
        publish(&snapshot_tx, &dispatcher);
    }
    info!(repo_id = %dispatcher.subject(), "Watch session closed");
}

fn publish(snapshot_tx: &watch::Sender<WatchSnapshot>, dispatcher: &Dispatcher) {
    let next = dispatcher.snapshot();
    snapshot_tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

fn spawn_effects(
    api: &Arc<dyn AuditApi>,
    tx: &mpsc::UnboundedSender<Message>,
    effects: Vec<Effect>,
) {
    for effect in effects {
        let api = Arc::clone(api);
        let tx = tx.clone();
        tokio::spawn(async move {
            let completion = match effect {
                Effect::FetchPage {
                    repo_id,
                    offset,
                    limit,
                    reason,
                    epoch,
                } => {
                    let result = api.list_audits(&repo_id, limit, offset).await;
                    Completion::Page {
                        repo_id,
                        offset,
                        limit,
                        reason,
                        epoch,
                        result,
                    }
                }
                Effect::BeginSync { repo_id } => {
                    let result = api.begin_sync(&repo_id).await;
                    Completion::Sync { repo_id, result }
                }
                Effect::FetchProjects => Completion::Projects {
                    result: api.list_projects().await,
                },
            };
            let _ = tx.send(Message::Completed(completion));
        });
    }
}
