use log::{debug, error, info, warn};
use std::fmt::Display;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::codec::{self, CommandSet, BROADCAST_ADDRESS};
use crate::notifier::{Notifier, NotifyWorker};
use crate::transport::RfidTransport;
use crate::types::{ResponseOutcome, ScanEvent, ScanState, UhfError, NO_UID};

/// Consumer of scan status.
///
/// Called from the polling thread while the session lock is held, so an
/// implementation must not call back into the [`ScanLoop`].
pub trait StatusSink: Send + Sync {
    fn report(&self, event: &ScanEvent);
}

impl<F> StatusSink for F
where
    F: Fn(&ScanEvent) + Send + Sync,
{
    fn report(&self, event: &ScanEvent) {
        self(event)
    }
}

/// Writes every event to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, event: &ScanEvent) {
        match event {
            ScanEvent::PortError(_)
            | ScanEvent::InvalidPosition(_)
            | ScanEvent::PortDisconnected
            | ScanEvent::CycleError(_)
            | ScanEvent::NotifyFailed { .. } => warn!("{}", event),
            ScanEvent::CardNotDetected | ScanEvent::DuplicateSuppressed(_) => debug!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// Polling parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Reader address substituted into the command templates
    pub address: u8,
    pub baud_rate: u32,
    pub read_timeout_ms: u32,
    /// Upper bound on bytes read per cycle
    pub read_buffer: usize,
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            address: BROADCAST_ADDRESS,
            baud_rate: 57600,
            read_timeout_ms: 100,
            read_buffer: 512,
            interval: Duration::from_secs(1),
        }
    }
}

/// Operator-supplied settings plus the last accepted tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub port: String,
    pub position: String,
    pub last_uid: String,
}

struct Inner<T> {
    transport: Option<T>,
    session: Option<Session>,
    scanning: bool,
    notifier: Option<NotifyWorker>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    wake: Condvar,
    sink: Arc<dyn StatusSink>,
    frame: Vec<u8>,
    options: ScanOptions,
}

/// Polls a reader for tags and forwards each new one.
///
/// ```ignore
/// use std::sync::Arc;
/// use uhf_scan::{LogSink, ScanLoop, ScanOptions};
///
/// let mut scanner = ScanLoop::new(ScanOptions::default(), Arc::new(LogSink))?;
/// scanner.configure_serial("/dev/ttyUSB0", "7")?;
/// scanner.start()?;
/// ```
pub struct ScanLoop<T: RfidTransport + 'static> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: RfidTransport + 'static> ScanLoop<T> {
    pub fn new(options: ScanOptions, sink: Arc<dyn StatusSink>) -> Result<Self, UhfError> {
        if options.read_buffer == 0 {
            return Err(UhfError::InvalidParameter("Read buffer must be at least 1 byte".into()));
        }
        let frame = CommandSet::new(options.address)?.inventory_frame();
        debug!("Inventory frame: {:02X?}", frame);

        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    transport: None,
                    session: None,
                    scanning: false,
                    notifier: None,
                }),
                wake: Condvar::new(),
                sink,
                frame,
                options,
            }),
            worker: None,
        })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.shared.options
    }

    pub fn state(&self) -> ScanState {
        self.lock().state()
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scanning
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Last accepted UID, or `"00000000"` before the first tag
    pub fn last_uid(&self) -> String {
        self.lock()
            .session
            .as_ref()
            .map_or_else(|| NO_UID.to_string(), |s| s.last_uid.clone())
    }

    /// Enable, replace or disable (`None`) forwarding of accepted tags
    pub fn set_notifier(&mut self, notifier: Option<Box<dyn Notifier>>) {
        let worker = notifier.map(|n| NotifyWorker::spawn(n, Arc::clone(&self.shared.sink)));
        let previous = std::mem::replace(&mut self.lock().notifier, worker);
        // joins the old worker outside the lock
        drop(previous);
    }

    /// Open a channel with `open` and bind it to `port` and `position`.
    ///
    /// A position that is not a number is rejected before anything changes.
    /// Otherwise any scan in progress is stopped and the previous channel
    /// released first, and a failure to open leaves the loop `Idle`.
    pub fn configure<F, E>(&mut self, port: &str, position: &str, open: F) -> Result<(), UhfError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Display,
    {
        if let Err(e) = validate_position(position) {
            self.shared.sink.report(&ScanEvent::InvalidPosition(position.to_string()));
            return Err(e);
        }
        self.close();

        match open(port) {
            Ok(transport) => {
                let mut inner = self.lock();
                inner.transport = Some(transport);
                inner.session = Some(Session {
                    port: port.to_string(),
                    position: position.to_string(),
                    last_uid: NO_UID.to_string(),
                });
                self.shared.sink.report(&ScanEvent::Configured {
                    port: port.to_string(),
                    position: position.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                let msg = e.to_string();
                self.shared.sink.report(&ScanEvent::PortError(msg.clone()));
                Err(UhfError::Port(msg))
            }
        }
    }

    /// Begin polling on a background thread
    pub fn start(&mut self) -> Result<(), UhfError> {
        match self.state() {
            ScanState::Idle => {
                return Err(UhfError::InvalidState {
                    action: "start",
                    state: ScanState::Idle,
                });
            }
            ScanState::Scanning => return Ok(()),
            ScanState::Ready => {}
        }
        // a thread that stopped itself on disconnect may still be winding down
        self.join_worker();
        self.lock().scanning = true;
        self.shared.sink.report(&ScanEvent::Started);

        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || poll(shared)));
        Ok(())
    }

    /// Stop polling. No cycle runs after this returns. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let was_scanning = std::mem::replace(&mut self.lock().scanning, false);
        self.shared.wake.notify_all();
        self.join_worker();

        if was_scanning {
            self.shared.sink.report(&ScanEvent::Stopped);
        }
    }

    /// Stop polling and release the channel. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.stop();
        let transport = {
            let mut inner = self.lock();
            inner.session = None;
            inner.transport.take()
        };
        if let Some(transport) = transport {
            drop(transport);
            info!("Serial channel released");
        }
    }

    /// Run one cycle on the calling thread.
    ///
    /// Follows the same dedup and stop rules as the polling thread; a
    /// transport failure is reported to the sink and also returned.
    pub fn run_cycle(&self) -> Result<ResponseOutcome, UhfError> {
        let mut inner = self.lock();
        cycle(&self.shared, &mut inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Polling thread panicked");
            }
        }
    }
}

#[cfg(feature = "serial")]
impl ScanLoop<crate::serial::SerialTransport> {
    /// [`configure`](Self::configure) with a serial port at the configured baud rate and timeout
    pub fn configure_serial(&mut self, port: &str, position: &str) -> Result<(), UhfError> {
        let baud_rate = self.shared.options.baud_rate;
        let timeout_ms = self.shared.options.read_timeout_ms;
        self.configure(port, position, |name| {
            crate::serial::SerialTransport::with_timeout(name, baud_rate, timeout_ms)
        })
    }
}

impl<T: RfidTransport + 'static> Drop for ScanLoop<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> Inner<T> {
    fn state(&self) -> ScanState {
        match (&self.transport, self.scanning) {
            (None, _) => ScanState::Idle,
            (Some(_), true) => ScanState::Scanning,
            (Some(_), false) => ScanState::Ready,
        }
    }
}

/// Position labels are operator-entered numbers
fn validate_position(position: &str) -> Result<(), UhfError> {
    if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UhfError::InvalidParameter(format!(
            "Position must be a number, got {:?}",
            position
        )));
    }
    Ok(())
}

fn poll<T: RfidTransport>(shared: Arc<Shared<T>>) {
    let mut inner = shared.inner.lock().unwrap_or_else(PoisonError::into_inner);
    while inner.scanning {
        let _ = cycle(&shared, &mut inner);
        if !inner.scanning {
            break;
        }
        inner = match shared
            .wake
            .wait_timeout_while(inner, shared.options.interval, |i| i.scanning)
        {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
    debug!("Polling thread exiting");
}

fn cycle<T: RfidTransport>(shared: &Shared<T>, inner: &mut Inner<T>) -> Result<ResponseOutcome, UhfError> {
    let Some(transport) = inner.transport.as_mut() else {
        return Err(UhfError::InvalidState {
            action: "scan",
            state: ScanState::Idle,
        });
    };

    let response = match exchange(transport, &shared.frame, &shared.options) {
        Ok(response) => response,
        Err(e) => {
            inner.scanning = false;
            shared.sink.report(&ScanEvent::CycleError(e.to_string()));
            return Err(e);
        }
    };

    let outcome = codec::decode(&response);
    match &outcome {
        ResponseOutcome::NoResponse => {
            inner.scanning = false;
            shared.sink.report(&ScanEvent::PortDisconnected);
        }
        ResponseOutcome::CardNotDetected => {
            shared.sink.report(&ScanEvent::CardNotDetected);
        }
        ResponseOutcome::Uid(uid) => {
            if let Some(session) = inner.session.as_mut() {
                if session.last_uid == *uid {
                    shared.sink.report(&ScanEvent::DuplicateSuppressed(uid.clone()));
                } else {
                    session.last_uid = uid.clone();
                    shared.sink.report(&ScanEvent::TagAccepted(uid.clone()));
                    if let Some(notifier) = &inner.notifier {
                        notifier.dispatch(&session.position, uid);
                    }
                }
            }
        }
    }
    Ok(outcome)
}

/// Send the frame and collect the reply until the reader goes quiet or the buffer fills
fn exchange<T: RfidTransport>(transport: &mut T, frame: &[u8], options: &ScanOptions) -> Result<Vec<u8>, UhfError> {
    transport
        .clear_input()
        .map_err(|e| UhfError::Transport(format!("{:?}", e)))?;
    debug!("Sending command: {:02X?}", frame);
    let written = transport
        .write(frame)
        .map_err(|e| UhfError::Transport(format!("{:?}", e)))?;
    debug!("Wrote {} bytes", written);

    let mut response = vec![0u8; options.read_buffer];
    let mut filled = 0;
    while filled < response.len() {
        let bytes_read = transport
            .read(&mut response[filled..], options.read_timeout_ms)
            .map_err(|e| UhfError::Transport(format!("{:?}", e)))?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
    }
    response.truncate(filled);
    debug!("Received {} bytes: {:02X?}", filled, response);
    Ok(response)
}
