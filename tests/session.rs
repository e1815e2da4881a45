//! Session tests over in-memory MIDI ports.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{serve, FakeDevice, CATALOG};
use punck_link::catalog::Voice;
use punck_link::model::{Cell, SequenceGrid};
use punck_link::params::FieldValue;
use punck_link::protocol::Command;
use punck_link::session::{Edit, Session};
use punck_link::sync::{ConnectionState, SyncEvent};
use punck_link::PunckError;
use tokio::io::duplex;

fn start(device: FakeDevice, auto_update: bool) -> (Session, Arc<Mutex<FakeDevice>>) {
    let device = Arc::new(Mutex::new(device));
    let (host, port) = duplex(4096);
    tokio::spawn(serve(device.clone(), port));
    let (midi_in, midi_out) = tokio::io::split(host);
    let session = Session::builder()
        .auto_update(auto_update)
        .start(midi_in, midi_out);
    (session, device)
}

async fn wait_for(session: &mut Session, expected: SyncEvent) {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            match session.next_event().await {
                Some(event) if event == expected => return,
                Some(_) => continue,
                None => panic!("session stopped before {:?}", expected),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}", expected));
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

fn grid_with_kick(seq: u8) -> SequenceGrid {
    let mut grid = SequenceGrid::new(seq, 16, 2, CATALOG.grid_voice_count());
    grid.set(1, 0, 4, Cell::new(110, 3)).unwrap();
    grid
}

/// Test that a new session loads the sample banks and the active sequence.
#[tokio::test]
async fn test_session_connect_sweep() {
    let mut device = FakeDevice::new().with_sequence(grid_with_kick(2));
    device.active_sequence = 2;
    let (mut session, _device) = start(device, false);

    wait_for(&mut session, SyncEvent::Connection(ConnectionState::Connected)).await;
    wait_for(&mut session, SyncEvent::SequenceLoaded(2)).await;

    let model = session.handle().snapshot().await.unwrap();
    assert_eq!(model.grid, grid_with_kick(2));
    assert_eq!(model.sample_banks.len(), 2);

    let file = session.handle().export().await.unwrap();
    assert_eq!(file.seq, 2);
    assert_eq!(file.cells.len(), 1);
    assert_eq!(file.cells[0].pos, "1Kick4");
}

/// Test that edits sent through the handle reach the device.
#[tokio::test]
async fn test_session_edits_reach_device() {
    let (mut session, device) = start(FakeDevice::new(), false);
    wait_for(&mut session, SyncEvent::SequenceLoaded(0)).await;
    let handle = session.handle();

    handle
        .edit(Edit::SetCell {
            bar: 0,
            voice: Voice::Snare,
            beat: 3,
            cell: Cell::new(90, 1),
        })
        .await
        .unwrap();
    handle
        .edit(Edit::SetParameter {
            voice: Voice::HiHat,
            field: "Partial 2 FM Amount".to_string(),
            value: FieldValue::U8(200),
        })
        .await
        .unwrap();
    handle.edit(Edit::SaveConfig).await.unwrap();

    wait_until(|| device.lock().unwrap().saves == 1).await;
    let device = device.lock().unwrap();
    assert_eq!(device.sequence(0).get(0, 1, 3), Cell::new(90, 1));
    assert_eq!(
        device.voices[&Voice::HiHat].get("Partial 2 FM Amount"),
        Some(FieldValue::U8(200))
    );
}

/// Test that an invalid edit is rejected without touching the device.
#[tokio::test]
async fn test_session_rejects_invalid_edit() {
    let (mut session, device) = start(FakeDevice::new(), false);
    wait_for(&mut session, SyncEvent::SequenceLoaded(0)).await;
    let handle = session.handle();

    let err = handle
        .edit(Edit::Resize {
            bars: 5,
            beats_per_bar: 16,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PunckError::OutOfRange(_)));

    let err = handle
        .edit(Edit::SetParameter {
            voice: Voice::SamplerA,
            field: "Level".to_string(),
            value: FieldValue::F32(1.0),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PunckError::NoParameterBlock(_)));

    assert!(matches!(
        handle.edit(Edit::PasteBar(0)).await,
        Err(PunckError::OutOfRange(_))
    ));

    handle.snapshot().await.unwrap();
    assert!(device.lock().unwrap().received(Command::SetSequence).is_empty());
}

/// Test that status polling follows the device onto another sequence.
#[tokio::test(start_paused = true)]
async fn test_session_polls_status() {
    let mut device = FakeDevice::new().with_sequence(grid_with_kick(4));
    device.playing = true;
    let (mut session, device) = start(device, true);
    wait_for(&mut session, SyncEvent::SequenceLoaded(0)).await;

    device.lock().unwrap().active_sequence = 4;
    wait_for(&mut session, SyncEvent::SequenceLoaded(4)).await;

    let model = session.handle().snapshot().await.unwrap();
    assert_eq!(model.displayed_sequence(), 4);
    assert!(model.is_playing());
    assert!(!device.lock().unwrap().received(Command::GetStatus).is_empty());
}

/// Test that start/stop toggles playback and schedules a quick status check.
#[tokio::test(start_paused = true)]
async fn test_session_start_stop() {
    let (mut session, device) = start(FakeDevice::new(), true);
    wait_for(&mut session, SyncEvent::SequenceLoaded(0)).await;

    session.handle().start_stop().await.unwrap();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), session.next_event())
            .await
            .unwrap()
            .unwrap();
        if let SyncEvent::StatusUpdated(status) = event {
            if status.playing {
                break;
            }
        }
    }
    assert!(device.lock().unwrap().playing);
}

/// Test that a dead output port is reported once and sends are skipped.
#[tokio::test]
async fn test_session_reports_disconnect() {
    let (midi_in, _device_out) = duplex(64);
    let (midi_out, device_in) = duplex(64);
    drop(device_in);

    let mut session = Session::builder().start(midi_in, midi_out);
    wait_for(&mut session, SyncEvent::Connection(ConnectionState::Connected)).await;

    let handle = session.handle();
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.refresh_adc().await.unwrap();
    wait_for(&mut session, SyncEvent::Connection(ConnectionState::Disconnected)).await;

    // Later sends are skipped without another notification
    handle.refresh_reverb().await.unwrap();
    handle.snapshot().await.unwrap();
    let again = tokio::time::timeout(Duration::from_millis(50), session.next_event()).await;
    assert!(again.is_err());
}

/// Test that the session stops cleanly when the input closes.
#[tokio::test]
async fn test_session_ends_on_input_close() {
    let (midi_in, device_out) = duplex(64);
    let (midi_out, _device_in) = duplex(64);
    let session = Session::builder().start(midi_in, midi_out);

    drop(device_out);
    session.wait().await.unwrap();
}

/// Test that handles fail once the session is gone.
#[tokio::test]
async fn test_handle_after_session_stopped() {
    let (midi_in, device_out) = duplex(64);
    let (midi_out, _device_in) = duplex(64);
    let session = Session::builder().start(midi_in, midi_out);
    let handle = session.handle();

    drop(device_out);
    session.wait().await.unwrap_or_else(|e| panic!("{}", e));
    assert!(matches!(
        handle.refresh_config().await,
        Err(PunckError::ConnectionClosed)
    ));
}
