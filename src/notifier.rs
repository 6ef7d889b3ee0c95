//! Forwarding of accepted tags to a remote endpoint

use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::scanner::StatusSink;
use crate::types::{NotifyError, ScanEvent};

/// Receives `{position, uid}` for every newly accepted tag.
pub trait Notifier: Send {
    /// Deliver one notification and return the remote status code
    fn notify(&self, position: &str, uid: &str) -> Result<u16, NotifyError>;
}

/// HTTP GET `url?<position_param>=<position>&<uid_param>=<uid>`
#[cfg(feature = "http")]
pub struct HttpNotifier {
    client: reqwest::blocking::Client,
    url: String,
    position_param: String,
    uid_param: String,
}

#[cfg(feature = "http")]
impl HttpNotifier {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            position_param: "pos".to_string(),
            uid_param: "kode".to_string(),
        })
    }

    /// Override the query parameter names
    pub fn with_params(mut self, position_param: impl Into<String>, uid_param: impl Into<String>) -> Self {
        self.position_param = position_param.into();
        self.uid_param = uid_param.into();
        self
    }
}

#[cfg(feature = "http")]
impl Notifier for HttpNotifier {
    fn notify(&self, position: &str, uid: &str) -> Result<u16, NotifyError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[(self.position_param.as_str(), position), (self.uid_param.as_str(), uid)])
            .send()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(status)
        } else {
            Err(NotifyError::Status(status))
        }
    }
}

/// Notifications waiting while one is in flight; further tags are dropped
pub(crate) const QUEUE_BOUND: usize = 8;

struct Notification {
    position: String,
    uid: String,
}

/// Runs a [`Notifier`] on its own thread so a slow endpoint cannot stall polling.
///
/// Dropping the worker closes the queue and waits for pending notifications.
pub(crate) struct NotifyWorker {
    queue: Option<SyncSender<Notification>>,
    handle: Option<JoinHandle<()>>,
}

impl NotifyWorker {
    pub(crate) fn spawn(notifier: Box<dyn Notifier>, sink: Arc<dyn StatusSink>) -> Self {
        let (queue, requests) = mpsc::sync_channel::<Notification>(QUEUE_BOUND);
        let handle = thread::spawn(move || {
            for Notification { position, uid } in requests {
                debug!("Notifying position={} uid={}", position, uid);
                let event = match notifier.notify(&position, &uid) {
                    Ok(status) => ScanEvent::NotifySent { uid, status },
                    Err(e) => ScanEvent::NotifyFailed { uid, error: e.to_string() },
                };
                sink.report(&event);
            }
        });

        Self {
            queue: Some(queue),
            handle: Some(handle),
        }
    }

    /// Queue a notification without blocking. Returns `false` when it was dropped.
    pub(crate) fn dispatch(&self, position: &str, uid: &str) -> bool {
        let Some(queue) = self.queue.as_ref() else {
            return false;
        };
        let notification = Notification {
            position: position.to_string(),
            uid: uid.to_string(),
        };
        match queue.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Notification queue full, dropping {}", uid);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Notifier worker is gone, dropping notification for {}", uid);
                false
            }
        }
    }
}

impl Drop for NotifyWorker {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Notifier worker panicked");
            }
        }
    }
}
