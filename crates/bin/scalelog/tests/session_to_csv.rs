//! End-to-end: a full session through an in-memory transport into the real
//! CSV recorder.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use scalelog_adapter_csv::{CsvRecorder, Layout};
use scalelog_app::ports::{Transport, TransportError};
use scalelog_app::session::{ConnectionSession, SessionConfig, SessionOutcome};
use scalelog_domain::gatt::{
    Capabilities, CharacteristicDescriptor, WEIGHT_MEASUREMENT, WEIGHT_SCALE_SERVICE, sig_uuid,
};
use scalelog_domain::reading::RawFrame;

/// Scale that notifies a fixed list of payloads, one per second.
struct ScriptedScale {
    descriptors: Vec<CharacteristicDescriptor>,
    payloads: Vec<Vec<u8>>,
    read_value: Vec<u8>,
    /// Held until unsubscribe so the channel stays open after the last payload.
    sender: Mutex<Option<mpsc::Sender<RawFrame>>>,
}

impl ScriptedScale {
    fn notifying(payloads: Vec<Vec<u8>>) -> Self {
        Self {
            descriptors: vec![CharacteristicDescriptor::new(
                WEIGHT_SCALE_SERVICE,
                WEIGHT_MEASUREMENT,
                Capabilities::NOTIFY,
            )],
            payloads,
            read_value: Vec::new(),
            sender: Mutex::new(None),
        }
    }
}

impl Transport for ScriptedScale {
    type Link = ();

    fn connect(&self, _address: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }

    fn discover(
        &self,
        _link: &(),
    ) -> impl Future<Output = Result<Vec<CharacteristicDescriptor>, TransportError>> + Send {
        let descriptors = self.descriptors.clone();
        async move { Ok(descriptors) }
    }

    fn subscribe(
        &self,
        _link: &(),
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<RawFrame>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        *self.sender.lock().unwrap() = Some(frames.clone());
        let payloads = self.payloads.clone();
        tokio::spawn(async move {
            for payload in payloads {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if frames
                    .send(RawFrame::captured(characteristic, payload))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
        async { Ok(()) }
    }

    fn unsubscribe(
        &self,
        _link: &(),
        _characteristic: uuid::Uuid,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.sender.lock().unwrap().take();
        async { Ok(()) }
    }

    fn read_once(
        &self,
        _link: &(),
        _characteristic: uuid::Uuid,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let value = self.read_value.clone();
        async move { Ok(value) }
    }

    fn is_connected(&self, _link: &()) -> impl Future<Output = bool> + Send {
        async { true }
    }

    fn disconnect(&self, _link: &()) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.sender.lock().unwrap().take();
        async { Ok(()) }
    }
}

fn temp_csv() -> PathBuf {
    std::env::temp_dir().join(format!("scalelog-e2e-{}.csv", uuid::Uuid::new_v4()))
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn should_record_every_notification_as_a_csv_row() {
    let path = temp_csv();
    let recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
    let scale = ScriptedScale::notifying(vec![
        vec![0x00, 0x00, 0x14],
        vec![0x01, 0x64, 0x00],
        vec![0x00],
    ]);
    let config = SessionConfig::new("80:F4:AD:DD:37:9A", Duration::from_millis(3500));

    let report = ConnectionSession::new(scale, recorder, config)
        .run(std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.frames_recorded, 3);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "timestamp_utc,weight,unit");
    assert!(lines[1].ends_with(",25.600,kg"), "{}", lines[1]);
    assert!(lines[2].ends_with(",1.000,lb"), "{}", lines[2]);
    assert!(lines[3].ends_with(",,"), "{}", lines[3]);
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_capture_raw_payload_and_services() {
    let path = temp_csv();
    let recorder = CsvRecorder::open(&path, Layout::Extended).unwrap();
    let scale = ScriptedScale::notifying(vec![vec![0x00, 0x00, 0x14]]);
    let config = SessionConfig::new("80:F4:AD:DD:37:9A", Duration::from_secs(2));

    ConnectionSession::new(scale, recorder, config)
        .run(std::future::pending::<()>())
        .await
        .unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines[0], "timestamp_utc,weight,unit,raw_hex,services");
    assert!(
        lines[1].ends_with(",25.600,kg,000014,0000181d-0000-1000-8000-00805f9b34fb"),
        "{}",
        lines[1]
    );
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_append_to_existing_file_without_second_header() {
    let path = temp_csv();

    for _ in 0..2 {
        let recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        let scale = ScriptedScale::notifying(vec![vec![0x00, 0x00, 0x14]]);
        let config = SessionConfig::new("80:F4:AD:DD:37:9A", Duration::from_millis(1500));
        ConnectionSession::new(scale, recorder, config)
            .run(std::future::pending::<()>())
            .await
            .unwrap();
    }

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("timestamp_utc")).count(),
        1
    );
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_poll_a_read_only_vendor_characteristic() {
    let vendor_service = uuid::Uuid::from_u128(0x0000_ffb0_0000_1000_8000_0080_5f9b_34fb);
    let vendor_char = uuid::Uuid::from_u128(0x0000_ffb2_0000_1000_8000_0080_5f9b_34fb);
    let path = temp_csv();
    let recorder = CsvRecorder::open(&path, Layout::Extended).unwrap();
    let scale = ScriptedScale {
        descriptors: vec![
            CharacteristicDescriptor::new(sig_uuid(0x1800), sig_uuid(0x2A00), Capabilities::WRITE),
            CharacteristicDescriptor::new(vendor_service, vendor_char, Capabilities::READ),
        ],
        payloads: Vec::new(),
        // Fixed-offset u16: 0x3840 × 0.005 = 72 kg.
        read_value: vec![0x40, 0x38],
        sender: Mutex::new(None),
    };
    let config = SessionConfig::new("80:F4:AD:DD:37:9A", Duration::from_millis(1500));

    let report = ConnectionSession::new(scale, recorder, config)
        .run(std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(report.characteristic, Some(vendor_char));
    // Probe read, then polls at 0 s and 1 s.
    assert_eq!(report.frames_recorded, 3);
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 4);
    for line in &lines[1..] {
        assert!(line.contains(",72.000,kg,4038,"), "{line}");
    }
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_stop_on_shutdown_and_keep_rows_written_so_far() {
    let path = temp_csv();
    let recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
    let scale = ScriptedScale::notifying(vec![vec![0x00, 0x00, 0x14]; 10]);
    let config = SessionConfig::new("80:F4:AD:DD:37:9A", Duration::from_secs(60));
    let shutdown = tokio::time::sleep(Duration::from_millis(2500));

    let report = ConnectionSession::new(scale, recorder, config)
        .run(shutdown)
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert_eq!(report.frames_recorded, 2);
    assert_eq!(read_lines(&path).len(), 3);
    std::fs::remove_file(&path).unwrap();
}
