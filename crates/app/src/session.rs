//! Connection session — one bounded run of the reading pipeline.
//!
//! A [`ConnectionSession`] owns the whole lifecycle against one peripheral:
//!
//! ```text
//! Connecting → Discovering → Selecting → Subscribed | Polling
//!     ↑                                        │ link lost
//!  Retrying ← ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ Disconnected
//! ```
//!
//! Every decision is delegated to the pure [`transition`] function; this
//! module only performs the IO of each phase and turns its result into a
//! [`SessionEvent`]. The absolute deadline bounds every wait, and a shutdown
//! future passed to [`ConnectionSession::run`] is observed at every wait
//! point. Whatever the exit path, the subscription is cancelled, the link is
//! released and the recorder is closed exactly once.

mod phase;

pub use phase::{Phase, SessionEvent, transition};

use std::future::Future;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use scalelog_domain::decoder::PayloadDecoder;
use scalelog_domain::gatt::{self, CharacteristicDescriptor};
use scalelog_domain::reading::{DecodedReading, RawFrame};

use crate::link_loss::LinkLoss;
use crate::ports::{Recorder, RecorderError, Transport, TransportError};
use crate::selector::{CharacteristicSelector, NoSuitableCharacteristic, Selection};

/// Upper bound for best-effort teardown calls (unsubscribe, disconnect).
const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Stand-in for "no deadline" when `now + duration` overflows.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `Instant::now() + after`, saturating to roughly 30 years ahead.
fn instant_after(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Parameters of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Peripheral address, already resolved.
    pub address: String,
    /// Total session length; the deadline is `start + duration`.
    pub duration: Duration,
    /// Reconnect after connect failures and link loss.
    pub auto_reconnect: bool,
    /// Wait before each reconnect attempt.
    pub retry_interval: Duration,
    /// Read period in polling mode.
    pub poll_interval: Duration,
    /// `is_connected` period when the transport has no disconnect events.
    pub liveness_interval: Duration,
    /// Capacity of the notification channel.
    pub frame_buffer: usize,
}

impl SessionConfig {
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_millis(500);
    pub const DEFAULT_FRAME_BUFFER: usize = 64;

    /// Session without reconnect and with default intervals.
    #[must_use]
    pub fn new(address: impl Into<String>, duration: Duration) -> Self {
        Self {
            address: address.into(),
            duration,
            auto_reconnect: false,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            liveness_interval: Self::DEFAULT_LIVENESS_INTERVAL,
            frame_buffer: Self::DEFAULT_FRAME_BUFFER,
        }
    }

    /// Enable reconnect, waiting `retry_interval` before each attempt.
    #[must_use]
    pub fn with_reconnect(mut self, retry_interval: Duration) -> Self {
        self.auto_reconnect = true;
        self.retry_interval = retry_interval;
        self
    }
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The deadline was reached.
    Completed,
    /// The shutdown future resolved first.
    Cancelled,
}

/// Summary returned by a session that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub connection_attempts: u32,
    pub frames_recorded: u64,
    /// Characteristic chosen on the last successful selection.
    pub characteristic: Option<uuid::Uuid>,
}

/// Terminal session failure.
///
/// Every variant names the phase it happened in and whether a reconnect had
/// been attempted before.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(
        "connect failed in phase connecting after {attempts} attempt(s) (retry attempted: {retried})"
    )]
    Connect {
        attempts: u32,
        retried: bool,
        #[source]
        source: Option<TransportError>,
    },

    #[error("service discovery failed in phase discovering (retry attempted: {retried})")]
    Discovery {
        retried: bool,
        #[source]
        source: Option<TransportError>,
    },

    #[error("no usable weight characteristic in phase selecting (retry attempted: {retried})")]
    NoSuitableCharacteristic {
        retried: bool,
        #[source]
        source: NoSuitableCharacteristic,
    },

    #[error(
        "link lost in phase disconnected with reconnect disabled (retry attempted: {retried})"
    )]
    LinkLost { retried: bool },

    #[error("recording failed in phase {phase} (retry attempted: {retried})")]
    Recorder {
        phase: Phase,
        retried: bool,
        #[source]
        source: RecorderError,
    },
}

impl SessionError {
    /// Phase the failure happened in.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Connect { .. } => Phase::Connecting,
            Self::Discovery { .. } => Phase::Discovering,
            Self::NoSuitableCharacteristic { .. } => Phase::Selecting,
            Self::LinkLost { .. } => Phase::Disconnected,
            Self::Recorder { phase, .. } => *phase,
        }
    }

    /// Whether at least one reconnect had been attempted.
    #[must_use]
    pub fn retried(&self) -> bool {
        match self {
            Self::Connect { retried, .. }
            | Self::Discovery { retried, .. }
            | Self::NoSuitableCharacteristic { retried, .. }
            | Self::LinkLost { retried }
            | Self::Recorder { retried, .. } => *retried,
        }
    }
}

/// State owned by the session and mutated only by its transitions.
#[derive(Debug)]
struct SessionState {
    phase: Phase,
    chosen: Option<uuid::Uuid>,
    deadline: Instant,
    auto_reconnect: bool,
    retry_interval: Duration,
}

/// Per-connection data, reset at every connect attempt.
struct Attempt<L> {
    link: Option<L>,
    descriptors: Vec<CharacteristicDescriptor>,
    services: Vec<uuid::Uuid>,
    selection: Option<Selection>,
    subscribed: Option<uuid::Uuid>,
}

impl<L> Default for Attempt<L> {
    fn default() -> Self {
        Self {
            link: None,
            descriptors: Vec::new(),
            services: Vec::new(),
            selection: None,
            subscribed: None,
        }
    }
}

enum Step {
    Event(SessionEvent),
    Cancelled,
}

/// Result of an IO call raced against shutdown and the session deadline.
enum Bounded<O> {
    Done(O),
    Cancelled,
    DeadlineReached,
}

async fn bounded<F, O>(
    shutdown: Pin<&mut F>,
    deadline: Instant,
    work: impl Future<Output = O>,
) -> Bounded<O>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = shutdown => Bounded::Cancelled,
        result = tokio::time::timeout_at(deadline, work) => {
            result.map_or(Bounded::DeadlineReached, Bounded::Done)
        }
    }
}

/// Aborts the liveness task when the streaming phase ends.
struct LivenessMonitor(Option<JoinHandle<()>>);

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Drives the connect → discover → select → stream → retry lifecycle.
pub struct ConnectionSession<T: Transport, R> {
    transport: Arc<T>,
    recorder: R,
    config: SessionConfig,
    selector: CharacteristicSelector,
    decoder: PayloadDecoder,
    state: SessionState,
    attempt: Attempt<T::Link>,
    attempts: u32,
    frames: u64,
    last_error: Option<TransportError>,
}

impl<T, R> ConnectionSession<T, R>
where
    T: Transport + 'static,
    R: Recorder,
{
    /// Create a session with the default selector and decoder.
    pub fn new(transport: T, recorder: R, config: SessionConfig) -> Self {
        let state = SessionState {
            phase: Phase::Connecting,
            chosen: None,
            deadline: instant_after(config.duration),
            auto_reconnect: config.auto_reconnect,
            retry_interval: config.retry_interval,
        };
        Self {
            transport: Arc::new(transport),
            recorder,
            config,
            selector: CharacteristicSelector::default(),
            decoder: PayloadDecoder::default(),
            state,
            attempt: Attempt::default(),
            attempts: 0,
            frames: 0,
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: CharacteristicSelector) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: PayloadDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Run until the deadline, a terminal failure, or `shutdown` resolves.
    ///
    /// The recorder is closed exactly once before returning, on every path.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the session ends in
    /// [`Phase::Failed`] or a record could not be written.
    #[tracing::instrument(skip_all, fields(address = %self.config.address))]
    pub async fn run<F>(mut self, shutdown: F) -> Result<SessionReport, SessionError>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        self.state.deadline = instant_after(self.config.duration);
        tracing::info!(
            duration_secs = self.config.duration.as_secs(),
            auto_reconnect = self.state.auto_reconnect,
            "session started"
        );

        let result = self.drive(shutdown.as_mut()).await;
        self.release().await;
        let closed = self.recorder.close();

        let outcome = match (result, closed) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(source)) => {
                return Err(SessionError::Recorder {
                    phase: self.state.phase,
                    retried: self.retried(),
                    source,
                });
            }
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(err = %close_err, "failed to close recorder");
                }
                tracing::error!(%err, phase = %err.phase(), "session failed");
                return Err(err);
            }
        };

        tracing::info!(
            ?outcome,
            attempts = self.attempts,
            frames = self.frames,
            "session finished"
        );
        Ok(SessionReport {
            outcome,
            connection_attempts: self.attempts,
            frames_recorded: self.frames,
            characteristic: self.state.chosen,
        })
    }

    async fn drive<F>(&mut self, mut shutdown: Pin<&mut F>) -> Result<SessionOutcome, SessionError>
    where
        F: Future<Output = ()>,
    {
        loop {
            let step = match self.state.phase {
                Phase::Connecting => self.connect(shutdown.as_mut()).await,
                Phase::Discovering => self.discover(shutdown.as_mut()).await,
                Phase::Selecting => self.choose_characteristic(shutdown.as_mut()).await?,
                Phase::Subscribed => self.stream_notifications(shutdown.as_mut()).await?,
                Phase::Polling => self.poll(shutdown.as_mut()).await?,
                Phase::Disconnected => {
                    self.release().await;
                    Step::Event(SessionEvent::LinkReleased)
                }
                Phase::Retrying => self.wait_retry(shutdown.as_mut()).await,
                Phase::Completed => return Ok(SessionOutcome::Completed),
                Phase::Failed => return Err(self.failure(Phase::Failed)),
            };

            match step {
                Step::Cancelled => {
                    tracing::info!(phase = %self.state.phase, "session cancelled");
                    return Ok(SessionOutcome::Cancelled);
                }
                Step::Event(event) => {
                    if let Some(err) = self.advance(event) {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Apply `event`; returns the failure when the session enters `Failed`.
    fn advance(&mut self, event: SessionEvent) -> Option<SessionError> {
        let from = self.state.phase;
        let deadline_passed = Instant::now() >= self.state.deadline;
        let to = transition(from, event, deadline_passed, self.state.auto_reconnect);
        if to != from {
            tracing::info!(%from, %to, ?event, "session phase changed");
        }
        self.state.phase = to;

        if to == Phase::Failed {
            Some(self.failure(from))
        } else {
            None
        }
    }

    fn retried(&self) -> bool {
        self.attempts > 1
    }

    fn failure(&mut self, from: Phase) -> SessionError {
        let retried = self.retried();
        match from {
            Phase::Connecting => SessionError::Connect {
                attempts: self.attempts,
                retried,
                source: self.last_error.take(),
            },
            Phase::Discovering => SessionError::Discovery {
                retried,
                source: self.last_error.take(),
            },
            Phase::Selecting => SessionError::NoSuitableCharacteristic {
                retried,
                source: NoSuitableCharacteristic {
                    candidates: self.attempt.descriptors.len(),
                },
            },
            _ => SessionError::LinkLost { retried },
        }
    }

    async fn connect<F>(&mut self, shutdown: Pin<&mut F>) -> Step
    where
        F: Future<Output = ()>,
    {
        self.attempts += 1;
        self.attempt = Attempt::default();

        let transport = Arc::clone(&self.transport);
        let address = self.config.address.clone();
        let deadline = self.state.deadline;
        tracing::info!(attempt = self.attempts, %address, "connecting");

        let result = tokio::select! {
            biased;
            () = shutdown => return Step::Cancelled,
            result = tokio::time::timeout_at(deadline, transport.connect(&address)) => result,
        };

        match result {
            Err(_) => Step::Event(SessionEvent::DeadlineReached),
            Ok(Ok(link)) => {
                self.attempt.link = Some(link);
                Step::Event(SessionEvent::Connected)
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, attempt = self.attempts, "connect failed");
                self.last_error = Some(err);
                Step::Event(SessionEvent::ConnectFailed)
            }
        }
    }

    async fn discover<F>(&mut self, shutdown: Pin<&mut F>) -> Step
    where
        F: Future<Output = ()>,
    {
        let Some(link) = self.attempt.link.clone() else {
            return Step::Event(SessionEvent::DiscoveryFailed);
        };
        let transport = Arc::clone(&self.transport);
        let deadline = self.state.deadline;

        let result = tokio::select! {
            biased;
            () = shutdown => return Step::Cancelled,
            result = tokio::time::timeout_at(deadline, transport.discover(&link)) => result,
        };

        match result {
            Err(_) => Step::Event(SessionEvent::DeadlineReached),
            Ok(Ok(descriptors)) if !descriptors.is_empty() => {
                let services = gatt::service_ids(&descriptors);
                tracing::info!(
                    characteristics = descriptors.len(),
                    services = services.len(),
                    "discovery complete"
                );
                for descriptor in &descriptors {
                    tracing::debug!(
                        service = %descriptor.service,
                        characteristic = %descriptor.characteristic,
                        capabilities = %descriptor.capabilities,
                        "characteristic discovered"
                    );
                }
                self.attempt.services = services;
                self.attempt.descriptors = descriptors;
                Step::Event(SessionEvent::Discovered)
            }
            Ok(Ok(_)) => {
                tracing::warn!("discovery returned no characteristics");
                Step::Event(SessionEvent::DiscoveryFailed)
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "discovery failed");
                self.last_error = Some(err);
                Step::Event(SessionEvent::DiscoveryFailed)
            }
        }
    }

    async fn choose_characteristic<F>(
        &mut self,
        shutdown: Pin<&mut F>,
    ) -> Result<Step, SessionError>
    where
        F: Future<Output = ()>,
    {
        let Some(link) = self.attempt.link.clone() else {
            return Ok(Step::Event(SessionEvent::NoSuitableCharacteristic));
        };
        let deadline = self.state.deadline;

        let result = tokio::select! {
            biased;
            () = shutdown => return Ok(Step::Cancelled),
            result = tokio::time::timeout_at(
                deadline,
                self.selector.select(
                    self.transport.as_ref(),
                    &link,
                    &self.attempt.descriptors,
                    &self.decoder,
                ),
            ) => result,
        };

        match result {
            Err(_) => Ok(Step::Event(SessionEvent::DeadlineReached)),
            Ok(Err(err)) => {
                tracing::error!(%err, "characteristic selection failed");
                Ok(Step::Event(SessionEvent::NoSuitableCharacteristic))
            }
            Ok(Ok(selection)) => {
                tracing::info!(
                    service = %selection.descriptor.service,
                    characteristic = %selection.descriptor.characteristic,
                    rule = ?selection.rule,
                    mode = ?selection.mode,
                    "weight characteristic selected"
                );
                self.state.chosen = Some(selection.descriptor.characteristic);
                if let Some(probe) = &selection.probe {
                    self.record_reading(probe)?;
                }
                let mode = selection.mode;
                self.attempt.selection = Some(selection);
                Ok(Step::Event(SessionEvent::Selected(mode)))
            }
        }
    }

    fn streaming_target(&self) -> Option<(T::Link, uuid::Uuid)> {
        let link = self.attempt.link.clone()?;
        let selection = self.attempt.selection.as_ref()?;
        Some((link, selection.descriptor.characteristic))
    }

    async fn stream_notifications<F>(
        &mut self,
        mut shutdown: Pin<&mut F>,
    ) -> Result<Step, SessionError>
    where
        F: Future<Output = ()>,
    {
        enum Exit {
            Cancelled,
            Deadline,
            LinkLost,
        }

        let Some((link, characteristic)) = self.streaming_target() else {
            return Ok(Step::Event(SessionEvent::LinkLost));
        };

        let deadline = self.state.deadline;
        let (tx, mut rx) = mpsc::channel(self.config.frame_buffer);
        let transport = Arc::clone(&self.transport);
        match bounded(
            shutdown.as_mut(),
            deadline,
            transport.subscribe(&link, characteristic, tx),
        )
        .await
        {
            Bounded::Done(Ok(())) => {}
            Bounded::Done(Err(err)) => {
                tracing::warn!(%err, %characteristic, "subscribe failed");
                return Ok(Step::Event(SessionEvent::LinkLost));
            }
            // The subscription may be half set up; teardown still cancels it.
            Bounded::Cancelled => {
                self.attempt.subscribed = Some(characteristic);
                return Ok(Step::Cancelled);
            }
            Bounded::DeadlineReached => {
                tracing::warn!(%characteristic, "subscribe still pending at deadline");
                self.attempt.subscribed = Some(characteristic);
                return Ok(Step::Event(SessionEvent::DeadlineReached));
            }
        }
        self.attempt.subscribed = Some(characteristic);
        tracing::info!(%characteristic, "subscribed to notifications");

        let loss = LinkLoss::new();
        let monitor = match bounded(shutdown.as_mut(), deadline, self.watch_link(&link, &loss))
            .await
        {
            Bounded::Done(monitor) => monitor,
            Bounded::Cancelled => return Ok(Step::Cancelled),
            Bounded::DeadlineReached => return Ok(Step::Event(SessionEvent::DeadlineReached)),
        };

        let exit = loop {
            let frame = tokio::select! {
                biased;
                () = shutdown.as_mut() => break Exit::Cancelled,
                () = tokio::time::sleep_until(deadline) => break Exit::Deadline,
                () = loss.lost() => break Exit::LinkLost,
                frame = rx.recv() => frame,
            };

            let Some(frame) = frame else {
                tracing::warn!(%characteristic, "notification stream closed");
                break Exit::LinkLost;
            };
            self.record_frame(&frame)?;
        };
        drop(monitor);

        // Frames delivered before the exit condition are still recorded.
        while let Ok(frame) = rx.try_recv() {
            self.record_frame(&frame)?;
        }
        self.unsubscribe().await;

        Ok(match exit {
            Exit::Cancelled => Step::Cancelled,
            Exit::Deadline => Step::Event(SessionEvent::DeadlineReached),
            Exit::LinkLost => {
                tracing::warn!(%characteristic, "link lost");
                Step::Event(SessionEvent::LinkLost)
            }
        })
    }

    async fn poll<F>(&mut self, mut shutdown: Pin<&mut F>) -> Result<Step, SessionError>
    where
        F: Future<Output = ()>,
    {
        let Some((link, characteristic)) = self.streaming_target() else {
            return Ok(Step::Event(SessionEvent::LinkLost));
        };
        tracing::info!(
            %characteristic,
            interval_ms = self.config.poll_interval.as_millis(),
            "polling characteristic"
        );

        let deadline = self.state.deadline;
        let loss = LinkLoss::new();
        let _monitor = match bounded(shutdown.as_mut(), deadline, self.watch_link(&link, &loss))
            .await
        {
            Bounded::Done(monitor) => monitor,
            Bounded::Cancelled => return Ok(Step::Cancelled),
            Bounded::DeadlineReached => return Ok(Step::Event(SessionEvent::DeadlineReached)),
        };
        let transport = Arc::clone(&self.transport);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.as_mut() => return Ok(Step::Cancelled),
                () = tokio::time::sleep_until(deadline) => {
                    return Ok(Step::Event(SessionEvent::DeadlineReached));
                }
                () = loss.lost() => {
                    tracing::warn!(%characteristic, "link lost");
                    return Ok(Step::Event(SessionEvent::LinkLost));
                }
                _ = ticker.tick() => {}
            }

            let read = tokio::select! {
                biased;
                () = shutdown.as_mut() => return Ok(Step::Cancelled),
                read = tokio::time::timeout_at(
                    deadline,
                    transport.read_once(&link, characteristic),
                ) => read,
            };

            match read {
                Err(_) => return Ok(Step::Event(SessionEvent::DeadlineReached)),
                Ok(Ok(bytes)) => {
                    self.record_frame(&RawFrame::captured(characteristic, bytes))?;
                }
                Ok(Err(err)) => {
                    tracing::warn!(%err, %characteristic, "poll read failed");
                }
            }
        }
    }

    async fn wait_retry<F>(&mut self, shutdown: Pin<&mut F>) -> Step
    where
        F: Future<Output = ()>,
    {
        let deadline = self.state.deadline;
        let wake = instant_after(self.state.retry_interval).min(deadline);
        tracing::info!(
            wait_ms = wake.saturating_duration_since(Instant::now()).as_millis(),
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = shutdown => return Step::Cancelled,
            () = tokio::time::sleep_until(wake) => {}
        }

        if Instant::now() >= deadline {
            Step::Event(SessionEvent::DeadlineReached)
        } else {
            Step::Event(SessionEvent::RetryElapsed)
        }
    }

    /// Wire `loss` to the transport's disconnect events, or to a liveness
    /// poll when the transport has none.
    async fn watch_link(&self, link: &T::Link, loss: &LinkLoss) -> LivenessMonitor {
        if self.transport.watch_disconnect(link, loss.clone()).await {
            tracing::debug!("watching transport disconnect events");
            return LivenessMonitor(None);
        }

        let interval = self.config.liveness_interval;
        tracing::debug!(
            interval_ms = interval.as_millis(),
            "no disconnect events, polling liveness"
        );
        let transport = Arc::clone(&self.transport);
        let link = link.clone();
        let loss = loss.clone();
        LivenessMonitor(Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !transport.is_connected(&link).await {
                    loss.set();
                    break;
                }
            }
        })))
    }

    fn record_frame(&mut self, frame: &RawFrame) -> Result<(), SessionError> {
        let reading = DecodedReading::from_frame(frame, self.decoder.decode(&frame.bytes));
        self.record_reading(&reading)
    }

    fn record_reading(&mut self, reading: &DecodedReading) -> Result<(), SessionError> {
        match reading.weight {
            Some(weight) => tracing::info!(%weight, method = %reading.method, "weight reading"),
            None => tracing::debug!(raw = %reading.raw_hex, "frame did not decode"),
        }

        if let Err(source) = self.recorder.append(reading, &self.attempt.services) {
            return Err(SessionError::Recorder {
                phase: self.state.phase,
                retried: self.retried(),
                source,
            });
        }
        self.frames += 1;
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        let Some(characteristic) = self.attempt.subscribed.take() else {
            return;
        };
        let Some(link) = self.attempt.link.as_ref() else {
            return;
        };

        match tokio::time::timeout(
            RELEASE_TIMEOUT,
            self.transport.unsubscribe(link, characteristic),
        )
        .await
        {
            Ok(Ok(())) => tracing::debug!(%characteristic, "unsubscribed"),
            Ok(Err(err)) => tracing::warn!(%err, %characteristic, "failed to unsubscribe"),
            Err(_) => tracing::warn!(%characteristic, "unsubscribe timed out"),
        }
    }

    /// Cancel any subscription and disconnect. Safe to call repeatedly.
    async fn release(&mut self) {
        self.unsubscribe().await;
        let Some(link) = self.attempt.link.take() else {
            return;
        };

        match tokio::time::timeout(RELEASE_TIMEOUT, self.transport.disconnect(&link)).await {
            Ok(Ok(())) => tracing::debug!("disconnected"),
            Ok(Err(err)) => tracing::warn!(%err, "failed to disconnect"),
            Err(_) => tracing::warn!("disconnect timed out"),
        }
    }
}
