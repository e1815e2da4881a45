//! Simulated Punck module shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use punck_link::catalog::{ResourceCatalog, Voice};
use punck_link::codec::FrameCodec;
use punck_link::model::SequenceGrid;
use punck_link::params::ParameterBlock;
use punck_link::protocol::{Command, FrameBuffer, ACTIVE_SEQUENCE};
use punck_link::sync::{sent_frames, Effect, SyncSequencer};

pub const CATALOG: &ResourceCatalog = &ResourceCatalog::PUNCK;

/// Device double answering requests the way the firmware does.
pub struct FakeDevice {
    pub banks: BTreeMap<u8, Vec<&'static str>>,
    pub sequences: BTreeMap<u8, SequenceGrid>,
    pub voices: BTreeMap<Voice, ParameterBlock>,
    pub adc: ParameterBlock,
    pub reverb: ParameterBlock,
    pub playing: bool,
    pub active_sequence: u8,
    pub saves: usize,
    pub received: Vec<Bytes>,
    /// Requests with these command codes go unanswered.
    pub mute: Vec<Command>,
}

impl FakeDevice {
    pub fn new() -> Self {
        let voices = CATALOG
            .config_voices
            .iter()
            .filter_map(|&v| {
                let schema = CATALOG.voice_schema(v).ok()?;
                Some((v, ParameterBlock::zeroed(schema)))
            })
            .collect();
        let sequences = (0..CATALOG.sequence_slots)
            .map(|seq| (seq, SequenceGrid::new(seq, 16, 1, CATALOG.grid_voice_count())))
            .collect();

        Self {
            banks: BTreeMap::from([(0, vec!["KICK", "SNARE"]), (1, vec!["CLAP"])]),
            sequences,
            voices,
            adc: ParameterBlock::zeroed(CATALOG.adc),
            reverb: ParameterBlock::zeroed(CATALOG.reverb),
            playing: false,
            active_sequence: 0,
            saves: 0,
            received: Vec::new(),
            mute: Vec::new(),
        }
    }

    /// Replace one stored sequence.
    pub fn with_sequence(mut self, grid: SequenceGrid) -> Self {
        self.sequences.insert(grid.seq(), grid);
        self
    }

    pub fn sequence(&self, seq: u8) -> &SequenceGrid {
        &self.sequences[&seq]
    }

    /// Handle one request frame, returning the response if there is one.
    pub fn respond(&mut self, raw: &[u8]) -> Option<Bytes> {
        self.received.push(Bytes::copy_from_slice(raw));
        let command = Command::from_code(*raw.get(1)?)?;
        if self.mute.contains(&command) {
            return None;
        }
        let selectors = raw.get(2..raw.len().saturating_sub(1)).unwrap_or(&[]);
        let selector = |i: usize| selectors.get(i).copied().unwrap_or(0);

        match command {
            Command::GetSamples => {
                let bank = selector(0);
                let mut body = vec![bank];
                for name in self.banks.get(&bank)? {
                    let mut padded = name.as_bytes().to_vec();
                    padded.resize(CATALOG.sample_name_width, b' ');
                    body.extend_from_slice(&padded);
                }
                Some(FrameCodec::encode_direct(Command::GetSamples, &body))
            }
            Command::GetSequence => {
                let seq = match selector(0) {
                    ACTIVE_SEQUENCE => self.active_sequence,
                    seq => seq,
                };
                let grid = self.sequences.get(&seq)?;
                let bar = selector(1);
                let mut body = vec![seq, grid.beats_per_bar(), grid.bars(), bar];
                body.extend_from_slice(&grid.encode_bar(bar, CATALOG.max_beats));
                Some(FrameCodec::encode_direct(Command::GetSequence, &body))
            }
            Command::SetSequence => {
                let frame = FrameCodec::decode_frame(raw).ok()?;
                let (seq, beats_per_bar, bars, bar) = (
                    frame.field(0)?,
                    frame.field(1)?,
                    frame.field(2)?,
                    frame.field(3)?,
                );
                let grid = self.sequences.entry(seq).or_insert_with(|| {
                    SequenceGrid::new(seq, beats_per_bar, bars, CATALOG.grid_voice_count())
                });
                if grid.bars() != bars || grid.beats_per_bar() != beats_per_bar {
                    grid.resize(bars, beats_per_bar);
                }
                grid.apply_bar(bar, frame.payload()).ok()?;
                None
            }
            Command::GetVoiceConfig => {
                let voice = Voice::from_id(selector(0))?;
                let block = self.voices.get(&voice)?;
                Some(FrameCodec::encode_nibble_packed(
                    Command::GetVoiceConfig,
                    &[voice.id()],
                    &block.encode(),
                ))
            }
            Command::SetVoiceConfig => {
                let frame = FrameCodec::decode_frame(raw).ok()?;
                let voice = Voice::from_id(frame.field(0)?)?;
                let schema = CATALOG.voice_schema(voice).ok()?;
                let block = ParameterBlock::decode(schema, frame.payload()).ok()?;
                self.voices.insert(voice, block);
                None
            }
            Command::GetAdc => Some(FrameCodec::encode_nibble_packed(
                Command::GetAdc,
                &[],
                &self.adc.encode(),
            )),
            Command::SetAdc => {
                let frame = FrameCodec::decode_frame(raw).ok()?;
                self.adc = ParameterBlock::decode(CATALOG.adc, frame.payload()).ok()?;
                None
            }
            Command::GetReverbConfig => Some(FrameCodec::encode_nibble_packed(
                Command::GetReverbConfig,
                &[],
                &self.reverb.encode(),
            )),
            Command::SetReverbConfig => {
                let frame = FrameCodec::decode_frame(raw).ok()?;
                self.reverb = ParameterBlock::decode(CATALOG.reverb, frame.payload()).ok()?;
                None
            }
            Command::GetStatus => Some(FrameCodec::encode_direct(
                Command::GetStatus,
                &[self.playing as u8, self.active_sequence, 0, 0],
            )),
            Command::StartStop => {
                self.playing = !self.playing;
                None
            }
            Command::SaveConfig => {
                self.saves += 1;
                None
            }
        }
    }

    /// Received requests with this command.
    pub fn received(&self, command: Command) -> Vec<&Bytes> {
        self.received
            .iter()
            .filter(|raw| raw.get(1) == Some(&command.code()))
            .collect()
    }
}

/// Carry out effects against the device until nothing is left to send.
///
/// Returns every effect produced along the way, the initial ones included.
pub fn drive(
    sync: &mut SyncSequencer,
    device: &mut FakeDevice,
    effects: Vec<Effect>,
) -> Vec<Effect> {
    let mut queue: VecDeque<Bytes> = sent_frames(&effects).into();
    let mut all = effects;
    while let Some(request) = queue.pop_front() {
        if let Some(response) = device.respond(&request) {
            let effects = sync.handle_frame(&response);
            queue.extend(sent_frames(&effects));
            all.extend(effects);
        }
    }
    all
}

/// Serve a device over an in-memory MIDI port until the host hangs up.
pub async fn serve(device: Arc<Mutex<FakeDevice>>, mut port: DuplexStream) {
    let mut frames = FrameBuffer::new();
    let mut buf = vec![0u8; 1024];
    loop {
        let n = match port.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let requests = frames.push(&buf[..n]);
        let responses: Vec<Bytes> = {
            let mut device = device.lock().unwrap();
            requests.iter().filter_map(|r| device.respond(r)).collect()
        };
        for response in responses {
            if port.write_all(&response).await.is_err() {
                return;
            }
        }
    }
}
