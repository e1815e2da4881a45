//! Pull-based synchronization with the device.
//!
//! The [`SyncSequencer`] keeps at most one request outstanding. Each entry
//! point updates the [`DeviceModel`] and returns the [`Effect`]s its owner
//! must carry out: frames to send, status timer changes and notifications.
//! The sequencer does no I/O itself and keeps no clock.
//!
//! # Sweeps
//!
//! ```text
//! connect ──► AwaitingSampleBank(0) ──► AwaitingSampleBank(1) ──┐
//!                                                               ▼
//! refresh_sequence(n) ──► AwaitingSequenceBar(n, 0) ──► ... (n, bars-1) ──► Idle
//! refresh_config ──► AwaitingVoiceConfig(0) ──► ... (last) ──► Idle
//! refresh_adc ──► AwaitingAdc ──► Idle
//! refresh_reverb ──► AwaitingReverb ──► Idle
//! status timer ──► AwaitingStatus ──► Idle, or a sequence refresh
//! ```
//!
//! A response advances the cursor only when it addresses the awaited
//! resource. Any other response is still applied by the ids it carries.
//! Nothing times out except the status poll: a lost response parks the
//! cursor until a new sweep is requested.
//!
//! # Example
//!
//! ```
//! use punck_link::catalog::ResourceCatalog;
//! use punck_link::sync::{sent_frames, SyncSequencer, SyncState};
//!
//! let mut sync = SyncSequencer::new(&ResourceCatalog::PUNCK);
//! let effects = sync.refresh_config();
//!
//! assert_eq!(sync.cursor().state(), SyncState::AwaitingVoiceConfig(0));
//! assert_eq!(&sent_frames(&effects)[0][..], &[0xF0, 0x1D, 0, 0xF7]);
//! ```

mod effect;
mod state;

pub use effect::{sent_frames, ConnectionState, Effect, SyncEvent};
pub use state::{SyncCursor, SyncState};

use bytes::Bytes;

use crate::catalog::{ResourceCatalog, Voice};
use crate::codec::FrameCodec;
use crate::config::PollIntervals;
use crate::error::{PunckError, Result};
use crate::model::{DeviceModel, PlaybackStatus, SampleBank, SequenceGrid, DEFAULT_BEATS_PER_BAR};
use crate::params::ParameterBlock;
use crate::protocol::{build_request, Command, Frame, ACTIVE_SEQUENCE};

/// Single-request-in-flight synchronization state machine.
#[derive(Debug)]
pub struct SyncSequencer {
    catalog: &'static ResourceCatalog,
    poll: PollIntervals,
    cursor: SyncCursor,
    model: DeviceModel,
    auto_update: bool,
}

impl SyncSequencer {
    /// Create a sequencer with default poll intervals.
    pub fn new(catalog: &'static ResourceCatalog) -> Self {
        Self::with_intervals(catalog, PollIntervals::default())
    }

    /// Create a sequencer with custom poll intervals.
    pub fn with_intervals(catalog: &'static ResourceCatalog, poll: PollIntervals) -> Self {
        Self {
            catalog,
            poll,
            cursor: SyncCursor::default(),
            model: DeviceModel::new(catalog),
            auto_update: false,
        }
    }

    #[inline]
    pub fn catalog(&self) -> &'static ResourceCatalog {
        self.catalog
    }

    #[inline]
    pub fn cursor(&self) -> SyncCursor {
        self.cursor
    }

    #[inline]
    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    /// Mutable model access for local edits.
    #[inline]
    pub fn model_mut(&mut self) -> &mut DeviceModel {
        &mut self.model
    }

    #[inline]
    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    /// Start the initial sweep: every sample bank, then the active sequence.
    pub fn connect(&mut self) -> Vec<Effect> {
        match self.catalog.sample_banks.first() {
            Some(&bank) => self.begin(
                SyncState::AwaitingSampleBank(bank),
                build_request(Command::GetSamples, &[bank]),
            ),
            None => self.refresh_sequence(ACTIVE_SEQUENCE),
        }
    }

    /// Fetch every bar of a sequence, superseding any sweep in progress.
    ///
    /// Pass [`ACTIVE_SEQUENCE`] to fetch whatever the device is playing.
    pub fn refresh_sequence(&mut self, seq: u8) -> Vec<Effect> {
        self.begin(
            SyncState::AwaitingSequenceBar { seq, bar: 0 },
            build_request(Command::GetSequence, &[seq, 0]),
        )
    }

    /// Fetch the parameter block of every configurable voice.
    pub fn refresh_config(&mut self) -> Vec<Effect> {
        match self.catalog.config_voices.first() {
            Some(&voice) => self.begin(
                SyncState::AwaitingVoiceConfig(0),
                build_request(Command::GetVoiceConfig, &[voice.id()]),
            ),
            None => {
                self.go_idle();
                Vec::new()
            }
        }
    }

    /// Fetch the calibration table.
    pub fn refresh_adc(&mut self) -> Vec<Effect> {
        self.begin(SyncState::AwaitingAdc, build_request(Command::GetAdc, &[0]))
    }

    /// Fetch the reverb block.
    pub fn refresh_reverb(&mut self) -> Vec<Effect> {
        self.begin(
            SyncState::AwaitingReverb,
            build_request(Command::GetReverbConfig, &[0]),
        )
    }

    /// Enable or disable periodic status polling.
    ///
    /// Enabling arms the status timer. Disabling takes effect the next time
    /// the timer fires.
    pub fn set_auto_update(&mut self, enabled: bool) -> Vec<Effect> {
        let was = self.auto_update;
        self.auto_update = enabled;
        if enabled && !was {
            vec![Effect::ArmStatusPoll(self.next_poll())]
        } else {
            Vec::new()
        }
    }

    /// Toggle playback of the displayed sequence.
    pub fn start_stop(&mut self) -> Vec<Effect> {
        let seq = self.model.displayed_sequence();
        let mut effects = vec![Effect::Send(build_request(Command::StartStop, &[seq]))];
        if self.auto_update {
            effects.push(Effect::ArmStatusPoll(self.poll.start_stop));
        }
        effects
    }

    /// Status timer expiry.
    ///
    /// Polls only when idle. A timer firing while a poll is still unanswered
    /// polls again; during any other sweep it re-arms without sending.
    pub fn on_status_timer(&mut self) -> Vec<Effect> {
        if !self.auto_update {
            return Vec::new();
        }
        match self.cursor.state() {
            SyncState::Idle | SyncState::AwaitingStatus => {
                if self.cursor.state() == SyncState::AwaitingStatus {
                    tracing::warn!("Status poll unanswered, polling again");
                }
                let mut effects = self.begin(
                    SyncState::AwaitingStatus,
                    build_request(Command::GetStatus, &[0]),
                );
                effects.push(Effect::ArmStatusPoll(self.next_poll()));
                effects
            }
            _ => vec![Effect::ArmStatusPoll(self.next_poll())],
        }
    }

    /// Decode and handle one complete inbound frame.
    ///
    /// Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, raw: &[u8]) -> Vec<Effect> {
        match FrameCodec::decode_frame(raw) {
            Ok(frame) => self.handle_decoded(&frame),
            Err(e) => {
                tracing::warn!("Discarding frame: {}", e);
                Vec::new()
            }
        }
    }

    /// Handle one decoded inbound frame.
    pub fn handle_decoded(&mut self, frame: &Frame) -> Vec<Effect> {
        let result = match frame.command {
            Command::GetSamples => self.on_samples(frame),
            Command::GetSequence => self.on_sequence(frame),
            Command::GetVoiceConfig => self.on_voice_config(frame),
            Command::GetAdc => self.on_adc(frame),
            Command::GetReverbConfig => self.on_reverb(frame),
            Command::GetStatus => self.on_status(frame),
            other => {
                tracing::warn!("Ignoring unexpected {:?} frame", other);
                Ok(Vec::new())
            }
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("Discarding {:?} response: {}", frame.command, e);
            Vec::new()
        })
    }

    fn begin(&mut self, state: SyncState, request: Bytes) -> Vec<Effect> {
        tracing::debug!("Sweep {:?} -> {:?}", self.cursor.state(), state);
        self.cursor = SyncCursor::start(state);
        vec![Effect::Send(request)]
    }

    fn advance(&mut self, state: SyncState, request: Bytes) -> Vec<Effect> {
        tracing::debug!("Cursor {:?} -> {:?}", self.cursor.state(), state);
        self.cursor.advance(state);
        vec![Effect::Send(request)]
    }

    fn go_idle(&mut self) {
        if !self.cursor.state().is_idle() {
            tracing::debug!("Cursor {:?} -> Idle", self.cursor.state());
        }
        self.cursor.advance(SyncState::Idle);
    }

    fn next_poll(&self) -> std::time::Duration {
        self.poll.next(self.model.is_playing())
    }

    fn on_samples(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        let bank = required_field(frame, 0)?;
        let names = SampleBank::decode(bank, frame.payload(), self.catalog.sample_name_width);
        self.model.sample_banks.insert(bank, names);

        let mut effects = vec![Effect::Notify(SyncEvent::SampleBankUpdated(bank))];
        if self.cursor.state() != SyncState::AwaitingSampleBank(bank) {
            tracing::warn!("Applied unrequested sample bank {}", bank);
            return Ok(effects);
        }

        let banks = self.catalog.sample_banks;
        let next = banks
            .iter()
            .position(|&b| b == bank)
            .and_then(|i| banks.get(i + 1))
            .copied();
        match next {
            Some(next) => effects.extend(self.advance(
                SyncState::AwaitingSampleBank(next),
                build_request(Command::GetSamples, &[next]),
            )),
            None => {
                self.go_idle();
                effects.extend(self.refresh_sequence(ACTIVE_SEQUENCE));
            }
        }
        Ok(effects)
    }

    fn on_sequence(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        let seq = required_field(frame, 0)?;
        let beats_per_bar = required_field(frame, 1)?
            .max(DEFAULT_BEATS_PER_BAR)
            .min(self.catalog.max_beats);
        let bars = required_field(frame, 2)?.max(1).min(self.catalog.max_bars);
        let bar = required_field(frame, 3)?;

        if bar >= bars {
            tracing::warn!(
                "Discarding bar {} of {}-bar sequence {}",
                bar,
                bars,
                seq
            );
            return Ok(Vec::new());
        }

        let awaited = matches!(
            self.cursor.state(),
            SyncState::AwaitingSequenceBar { seq: s, bar: b }
                if b == bar && (s == seq || s == ACTIVE_SEQUENCE)
        );

        if !awaited {
            let grid = &mut self.model.grid;
            if grid.seq() != seq || bar >= grid.bars() {
                tracing::warn!("Ignoring stale sequence {} bar {}", seq, bar);
                return Ok(Vec::new());
            }
            grid.apply_bar(bar, frame.payload())?;
            tracing::warn!("Applied unrequested sequence {} bar {}", seq, bar);
            return Ok(vec![Effect::Notify(SyncEvent::BarUpdated { seq, bar })]);
        }

        // The model is only replaced once the bar has decoded
        let mut effects = Vec::new();
        let grid = &self.model.grid;
        if bar == 0 {
            let mut fresh =
                SequenceGrid::new(seq, beats_per_bar, bars, self.catalog.grid_voice_count());
            fresh.apply_bar(bar, frame.payload())?;
            self.model.grid = fresh;
            effects.push(Effect::Notify(SyncEvent::GridReallocated {
                seq,
                beats_per_bar,
                bars,
            }));
        } else if grid.bars() != bars || grid.beats_per_bar() != beats_per_bar {
            let mut resized = grid.clone();
            resized.resize(bars, beats_per_bar);
            resized.apply_bar(bar, frame.payload())?;
            self.model.grid = resized;
        } else {
            self.model.grid.apply_bar(bar, frame.payload())?;
        }
        effects.push(Effect::Notify(SyncEvent::BarUpdated { seq, bar }));

        if bar + 1 < bars {
            effects.extend(self.advance(
                SyncState::AwaitingSequenceBar { seq, bar: bar + 1 },
                build_request(Command::GetSequence, &[seq, bar + 1]),
            ));
        } else {
            self.go_idle();
            effects.push(Effect::Notify(SyncEvent::SequenceLoaded(seq)));
            if self.auto_update {
                effects.push(Effect::ArmStatusPoll(self.next_poll()));
            }
        }
        Ok(effects)
    }

    fn on_voice_config(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        let voice = Voice::try_from_id(required_field(frame, 0)?)?;
        let schema = self.catalog.voice_schema(voice)?;
        let block = ParameterBlock::decode(schema, frame.payload())?;
        self.model.voices.insert(voice, block);

        let mut effects = vec![Effect::Notify(SyncEvent::VoiceConfigUpdated(voice))];
        let order = self.catalog.config_voices;
        match self.cursor.state() {
            SyncState::AwaitingVoiceConfig(i) if order.get(i) == Some(&voice) => {
                match order.get(i + 1) {
                    Some(&next) => effects.extend(self.advance(
                        SyncState::AwaitingVoiceConfig(i + 1),
                        build_request(Command::GetVoiceConfig, &[next.id()]),
                    )),
                    None => {
                        self.go_idle();
                        effects.push(Effect::Notify(SyncEvent::ConfigLoaded));
                    }
                }
            }
            _ => tracing::warn!("Applied unrequested {} config", voice),
        }
        Ok(effects)
    }

    fn on_adc(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        self.model.adc = ParameterBlock::decode(self.catalog.adc, frame.payload())?;
        if self.cursor.state() == SyncState::AwaitingAdc {
            self.go_idle();
        }
        Ok(vec![Effect::Notify(SyncEvent::AdcUpdated)])
    }

    fn on_reverb(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        self.model.reverb = ParameterBlock::decode(self.catalog.reverb, frame.payload())?;
        if self.cursor.state() == SyncState::AwaitingReverb {
            self.go_idle();
        }
        Ok(vec![Effect::Notify(SyncEvent::ReverbUpdated)])
    }

    fn on_status(&mut self, frame: &Frame) -> Result<Vec<Effect>> {
        let status = PlaybackStatus::decode(frame.payload())?;
        self.model.status = Some(status);

        let mut effects = vec![Effect::Notify(SyncEvent::StatusUpdated(status))];
        if self.cursor.state() != SyncState::AwaitingStatus {
            return Ok(effects);
        }

        let displayed = self.model.displayed_sequence();
        if status.playing && status.active_sequence != displayed {
            tracing::debug!(
                "Device playing sequence {}, displaying {}, resyncing",
                status.active_sequence,
                displayed
            );
            effects.extend(self.refresh_sequence(status.active_sequence));
        } else {
            self.go_idle();
            if self.auto_update {
                effects.push(Effect::ArmStatusPoll(self.poll.next(status.playing)));
            }
        }
        Ok(effects)
    }
}

fn required_field(frame: &Frame, index: usize) -> Result<u8> {
    frame.field(index).ok_or_else(|| {
        PunckError::Protocol(format!(
            "{:?} frame missing header field {}",
            frame.command, index
        ))
    })
}
