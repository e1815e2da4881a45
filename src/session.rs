//! Session builder and runtime loop.
//!
//! A [`Session`] owns one [`SyncSequencer`] and drives it from a single
//! task. The task waits on three sources at once:
//!
//! 1. Inbound bytes from the device, split into frames
//! 2. Editor requests from [`SessionHandle`]s
//! 3. The status poll deadline
//!
//! Every [`Effect`] the sequencer returns is carried out in order before
//! the next source is polled, so inbound frames and edits interleave at
//! frame granularity and nothing needs locking.
//!
//! # Example
//!
//! ```no_run
//! use punck_link::catalog::Voice;
//! use punck_link::model::Cell;
//! use punck_link::session::{Edit, Session};
//!
//! # async fn run<R, W>(midi_in: R, midi_out: W) -> punck_link::Result<()>
//! # where
//! #     R: tokio::io::AsyncRead + Unpin + Send + 'static,
//! #     W: tokio::io::AsyncWrite + Unpin + Send + 'static,
//! # {
//! let mut session = Session::builder().auto_update(true).start(midi_in, midi_out);
//! let handle = session.handle();
//!
//! handle.refresh_config().await?;
//! handle
//!     .edit(Edit::SetCell { bar: 0, voice: Voice::Kick, beat: 0, cell: Cell::new(127, 0) })
//!     .await?;
//!
//! while let Some(event) = session.next_event().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::catalog::{ResourceCatalog, Voice};
use crate::config::SessionConfig;
use crate::error::{PunckError, Result};
use crate::export::SequenceFile;
use crate::model::{Cell, DeviceModel};
use crate::params::FieldValue;
use crate::protocol::FrameBuffer;
use crate::publish::EditPublisher;
use crate::sync::{ConnectionState, Effect, SyncEvent, SyncSequencer};
use crate::writer::{spawn_writer_task, WriterConfig, WriterHandle};

/// A local edit, applied to the model and published immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SetCell {
        bar: u8,
        voice: Voice,
        beat: u8,
        cell: Cell,
    },
    SetLevel {
        bar: u8,
        voice: Voice,
        beat: u8,
        level: u8,
    },
    SetVariation {
        bar: u8,
        voice: Voice,
        beat: u8,
        variation: u8,
    },
    Resize {
        bars: u8,
        beats_per_bar: u8,
    },
    SetParameter {
        voice: Voice,
        field: String,
        value: FieldValue,
    },
    SetAdc {
        field: String,
        value: FieldValue,
    },
    SetReverb {
        field: String,
        value: FieldValue,
    },
    CopyBar(u8),
    PasteBar(u8),
    Import(SequenceFile),
    SaveConfig,
}

/// Requests carried from handles to the session task.
#[derive(Debug)]
enum Request {
    RefreshSequence(u8),
    RefreshConfig,
    RefreshAdc,
    RefreshReverb,
    SetAutoUpdate(bool),
    StartStop,
    Edit(Edit, oneshot::Sender<Result<()>>),
    Snapshot(oneshot::Sender<DeviceModel>),
    Export(oneshot::Sender<SequenceFile>),
}

/// Builder for configuring and starting a session.
pub struct SessionBuilder {
    config: SessionConfig,
    catalog: &'static ResourceCatalog,
}

impl SessionBuilder {
    /// Create a builder with default configuration for the Punck catalog.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            catalog: &ResourceCatalog::PUNCK,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different resource catalog.
    pub fn catalog(mut self, catalog: &'static ResourceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Poll the device status periodically.
    ///
    /// Default: off
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.config.auto_update = enabled;
        self
    }

    /// Set the status poll interval while playing.
    ///
    /// Default: 300 ms
    pub fn playing_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.playing = interval;
        self
    }

    /// Set the status poll interval while stopped.
    ///
    /// Default: 1500 ms
    pub fn stopped_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.stopped = interval;
        self
    }

    /// Set the delay before polling after a start/stop toggle.
    ///
    /// Default: 100 ms
    pub fn start_stop_poll_delay(mut self, delay: Duration) -> Self {
        self.config.poll.start_stop = delay;
        self
    }

    /// Set the inbound read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the command and writer queue capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the largest accepted inbound frame.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Spawn the writer and session tasks and start the initial sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<R, W>(self, reader: R, writer: W) -> Session
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Session::start(self.config, self.catalog, reader, writer)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running session.
pub struct Session {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    task: JoinHandle<Result<()>>,
    _writer_task: JoinHandle<Result<()>>,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    fn start<R, W>(
        config: SessionConfig,
        catalog: &'static ResourceCatalog,
        reader: R,
        writer: W,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer, writer_task) = spawn_writer_task(
            writer,
            WriterConfig {
                channel_capacity: config.channel_capacity,
            },
        );
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let (events_tx, events) = mpsc::unbounded_channel();

        let runner = SessionTask {
            sync: SyncSequencer::with_intervals(catalog, config.poll),
            publisher: EditPublisher::new(),
            writer,
            events: events_tx,
            frames: FrameBuffer::with_max_frame_len(config.max_frame_len),
            status_deadline: None,
            output_down: false,
        };
        let task = tokio::spawn(runner.run(reader, rx, config));

        Session {
            handle: SessionHandle { tx },
            events,
            task,
            _writer_task: writer_task,
        }
    }

    /// Get a handle for sending requests.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Wait for the next model notification.
    ///
    /// Returns `None` once the session task has stopped.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Wait for the session to stop (input closed or every handle dropped).
    pub async fn wait(self) -> Result<()> {
        let Session { handle, task, .. } = self;
        drop(handle);
        task.await
            .map_err(|e| PunckError::Protocol(format!("session task failed: {}", e)))?
    }
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Request>,
}

impl SessionHandle {
    async fn request(&self, request: Request) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| PunckError::ConnectionClosed)
    }

    /// Fetch a sequence.
    ///
    /// [`ACTIVE_SEQUENCE`](crate::protocol::ACTIVE_SEQUENCE) fetches the playing one.
    pub async fn refresh_sequence(&self, seq: u8) -> Result<()> {
        self.request(Request::RefreshSequence(seq)).await
    }

    /// Fetch every voice's parameters.
    pub async fn refresh_config(&self) -> Result<()> {
        self.request(Request::RefreshConfig).await
    }

    /// Fetch the calibration table.
    pub async fn refresh_adc(&self) -> Result<()> {
        self.request(Request::RefreshAdc).await
    }

    /// Fetch the reverb block.
    pub async fn refresh_reverb(&self) -> Result<()> {
        self.request(Request::RefreshReverb).await
    }

    /// Enable or disable status polling.
    pub async fn set_auto_update(&self, enabled: bool) -> Result<()> {
        self.request(Request::SetAutoUpdate(enabled)).await
    }

    /// Toggle playback.
    pub async fn start_stop(&self) -> Result<()> {
        self.request(Request::StartStop).await
    }

    /// Apply and publish an edit, waiting for it to be validated.
    pub async fn edit(&self, edit: Edit) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Edit(edit, reply)).await?;
        rx.await.map_err(|_| PunckError::ConnectionClosed)?
    }

    /// Copy of the current model.
    pub async fn snapshot(&self) -> Result<DeviceModel> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Snapshot(reply)).await?;
        rx.await.map_err(|_| PunckError::ConnectionClosed)
    }

    /// The displayed sequence in file form.
    pub async fn export(&self) -> Result<SequenceFile> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Export(reply)).await?;
        rx.await.map_err(|_| PunckError::ConnectionClosed)
    }
}

/// State owned by the session task.
struct SessionTask {
    sync: SyncSequencer,
    publisher: EditPublisher,
    writer: WriterHandle,
    events: mpsc::UnboundedSender<SyncEvent>,
    frames: FrameBuffer,
    status_deadline: Option<Instant>,
    output_down: bool,
}

impl SessionTask {
    async fn run<R>(
        mut self,
        mut reader: R,
        mut rx: mpsc::Receiver<Request>,
        config: SessionConfig,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.emit(SyncEvent::Connection(ConnectionState::Connected));
        let effects = self.sync.connect();
        self.apply(effects).await;
        if config.auto_update {
            let effects = self.sync.set_auto_update(true);
            self.apply(effects).await;
        }

        let mut buf = vec![0u8; config.read_buffer_size.max(1)];

        loop {
            tokio::select! {
                read = reader.read(&mut buf) => {
                    let n = match read {
                        Ok(0) => {
                            tracing::debug!("MIDI input closed");
                            return Ok(());
                        }
                        Ok(n) => n,
                        Err(e) => {
                            tracing::error!("Read loop error: {}", e);
                            return Err(PunckError::Io(e));
                        }
                    };
                    self.on_bytes(&buf[..n]).await;
                }
                request = rx.recv() => match request {
                    Some(request) => self.on_request(request).await,
                    None => {
                        tracing::debug!("All session handles dropped");
                        return Ok(());
                    }
                },
                _ = status_timer(self.status_deadline) => {
                    self.status_deadline = None;
                    let effects = self.sync.on_status_timer();
                    self.apply(effects).await;
                }
            }
        }
    }

    async fn on_bytes(&mut self, data: &[u8]) {
        for raw in self.frames.push(data) {
            tracing::trace!("<- {}", to_hex(&raw));
            let effects = self.sync.handle_frame(&raw);
            self.apply(effects).await;
        }
    }

    async fn on_request(&mut self, request: Request) {
        let effects = match request {
            Request::RefreshSequence(seq) => self.sync.refresh_sequence(seq),
            Request::RefreshConfig => self.sync.refresh_config(),
            Request::RefreshAdc => self.sync.refresh_adc(),
            Request::RefreshReverb => self.sync.refresh_reverb(),
            Request::SetAutoUpdate(enabled) => self.sync.set_auto_update(enabled),
            Request::StartStop => self.sync.start_stop(),
            Request::Edit(edit, reply) => {
                let result = self.edit(edit);
                let (effects, outcome) = match result {
                    Ok(effects) => (effects, Ok(())),
                    Err(e) => {
                        tracing::warn!("Rejected edit: {}", e);
                        (Vec::new(), Err(e))
                    }
                };
                self.apply(effects).await;
                let _ = reply.send(outcome);
                return;
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(self.sync.model().clone());
                return;
            }
            Request::Export(reply) => {
                let file = SequenceFile::from_grid(&self.sync.model().grid, self.sync.catalog());
                let _ = reply.send(file);
                return;
            }
        };
        self.apply(effects).await;
    }

    fn edit(&mut self, edit: Edit) -> Result<Vec<Effect>> {
        let sync = &mut self.sync;
        let publisher = &mut self.publisher;
        match edit {
            Edit::SetCell {
                bar,
                voice,
                beat,
                cell,
            } => publisher.set_cell(sync, bar, voice, beat, cell),
            Edit::SetLevel {
                bar,
                voice,
                beat,
                level,
            } => publisher.set_level(sync, bar, voice, beat, level),
            Edit::SetVariation {
                bar,
                voice,
                beat,
                variation,
            } => publisher.set_variation(sync, bar, voice, beat, variation),
            Edit::Resize {
                bars,
                beats_per_bar,
            } => publisher.resize(sync, bars, beats_per_bar),
            Edit::SetParameter {
                voice,
                field,
                value,
            } => publisher.set_parameter(sync, voice, &field, value),
            Edit::SetAdc { field, value } => publisher.set_adc(sync, &field, value),
            Edit::SetReverb { field, value } => publisher.set_reverb(sync, &field, value),
            Edit::CopyBar(bar) => publisher.copy_bar(sync, bar).map(|()| Vec::new()),
            Edit::PasteBar(bar) => publisher.paste_bar(sync, bar),
            Edit::Import(file) => publisher.import(sync, file),
            Edit::SaveConfig => Ok(publisher.save_config()),
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(frame) => self.send(frame).await,
                Effect::ArmStatusPoll(after) => {
                    self.status_deadline = Some(Instant::now() + after);
                }
                Effect::Notify(event) => self.emit(event),
            }
        }
    }

    /// Send a frame if the output is alive; skip it otherwise.
    async fn send(&mut self, frame: Bytes) {
        if !self.writer.is_connected() {
            self.mark_output_down();
            tracing::debug!("Skipping send of {} bytes", frame.len());
            return;
        }
        tracing::trace!("-> {}", to_hex(&frame));
        if let Err(e) = self.writer.send(frame).await {
            tracing::warn!("Send failed: {}", e);
            self.mark_output_down();
        }
    }

    fn mark_output_down(&mut self) {
        if !self.output_down {
            self.output_down = true;
            tracing::warn!("MIDI output unavailable, sends will be skipped");
            self.emit(SyncEvent::Connection(ConnectionState::Disconnected));
        }
    }

    fn emit(&self, event: SyncEvent) {
        tracing::debug!("Event {:?}", event);
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

async fn status_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
