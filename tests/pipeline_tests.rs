//! End-to-end runs through assembler, grouper and model.

use i2cniff::analyser::containers::{Ack, ByteRow, Confidence, Direction};
use i2cniff::analyser::grouper::group_packets;
use i2cniff::analyser::rules::{LIGHT_LEVELS, LIGHT_STATUS_REQUEST};
use i2cniff::analyser::utils;
use i2cniff::{CaptureError, ExpectationModel, Message, PacketAssembler};

fn write(t: f64, id: &str, addr: &str, bytes: &[&str], ack: Ack) -> Vec<ByteRow> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| ByteRow::new(t + i as f64 * 0.0001, id, addr, b, Direction::Write, ack))
        .collect()
}

/// Canonical read: every byte acked except the last.
fn read(t: f64, id: &str, addr: &str, bytes: &[&str]) -> Vec<ByteRow> {
    let n = bytes.len();
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let ack = if i + 1 == n { Ack::Nack } else { Ack::Ack };
            ByteRow::new(t + i as f64 * 0.0001, id, addr, b, Direction::Read, ack)
        })
        .collect()
}

fn messages(rows: &[ByteRow]) -> Vec<Message> {
    let packets = PacketAssembler::new().assemble(rows).unwrap();
    group_packets(packets)
}

#[test]
fn two_acked_write_rows_make_one_packet() {
    let rows = write(0.5, "p1", "20", &["01", "6B"], Ack::Ack);
    let packets = PacketAssembler::new().assemble(&rows).unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].data, "01 6B");
    assert_eq!(packets[0].ack, "");
    assert_eq!(packets[0].rw, Direction::Write);
}

#[test]
fn write_then_read_fuses_into_one_message() {
    let mut rows = write(1.0, "p1", "20", &["01", "6B", "02"], Ack::Ack);
    rows.extend(read(1.001, "p2", "20", &["00", "10", "5A"]));

    let messages = messages(&rows);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].data(), "01 6B 02 > 00 10 5A");
    assert_eq!(messages[0].ack(), "");
    assert_eq!(messages[0].packet_id(), "p1");
}

#[test]
fn sentinel_address_scenario() {
    let mut rows = write(1.0, "a", "18", &["30"], Ack::Nack);
    rows.extend(write(1.08, "b", "18", &["30"], Ack::Nack));
    rows.extend(write(3.08, "c", "18", &["30"], Ack::Nack));
    rows.extend(write(3.16, "d", "18", &["31"], Ack::Nack));

    let rated = ExpectationModel::standard().rate_all(messages(&rows));
    let scores: Vec<Confidence> = rated.iter().map(|m| m.known()).collect();
    assert_eq!(
        scores,
        vec![
            Confidence::Expected,
            Confidence::Expected,
            Confidence::TimingWayOff,
            Confidence::NotUnderstood
        ]
    );
    assert_eq!(rated[3].comment(), "Expecting 30");
}

#[test]
fn lighting_scenario() {
    let status: Vec<&str> = LIGHT_STATUS_REQUEST.split(' ').collect();
    let level: Vec<&str> = LIGHT_LEVELS[0].split(' ').collect();

    let mut rows = write(1.0, "a", "22", &status, Ack::Ack);
    rows.extend(read(1.001, "b", "22", &level));
    rows.extend(write(1.08, "c", "22", &["00", "00", "02", "03", "01", "44"], Ack::Ack));
    rows.extend(read(1.081, "d", "22", &["5A", "5A"]));
    // Poll right after the increase should report the next level.
    let next: Vec<&str> = LIGHT_LEVELS[1].split(' ').collect();
    rows.extend(write(1.083, "e", "22", &status, Ack::Ack));
    rows.extend(read(1.084, "f", "22", &next));

    let rated = ExpectationModel::standard().rate_all(messages(&rows));
    assert_eq!(rated.len(), 3);
    assert_eq!(rated[0].known(), Confidence::Expected);
    assert_eq!(rated[1].known(), Confidence::StateChanged);
    assert_eq!(rated[1].comment(), "Increase sent to light");
    assert_eq!(rated[2].known(), Confidence::Expected);
}

#[test]
fn unruled_addresses_stay_unclassified() {
    let rows = write(1.0, "a", "50", &["01", "02"], Ack::Ack);
    let rated = ExpectationModel::standard().rate_all(messages(&rows));
    assert_eq!(rated[0].known(), Confidence::Unclassified);
}

#[test]
fn desynchronised_capture_aborts() {
    let mut rows = write(1.0, "a", "20", &["01"], Ack::Ack);
    rows.push(ByteRow::new(1.0001, "a", "21", "02", Direction::Write, Ack::Ack));
    rows.extend(write(2.0, "b", "18", &["30"], Ack::Nack));

    let err = PacketAssembler::new().assemble(&rows).unwrap_err();
    assert!(matches!(err, CaptureError::MalformedCapture { .. }));
}

#[test]
fn loads_capture_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.csv");
    std::fs::write(
        &path,
        "Time [s],Packet ID,Address,Data,Read/Write,ACK/NAK\n\
         1.000000,0,0x18,0x30,Write,NAK\n\
         1.080000,1,0x18,0x30,Write,NAK\n",
    )
    .unwrap();

    let rows = utils::load_file(&path).unwrap();
    let rated = ExpectationModel::standard().rate_all(messages(&rows));
    assert_eq!(rated.len(), 2);
    assert!(rated.iter().all(|m| m.known() == Confidence::Expected));
    assert_eq!(rated[1].dataid(), 1);
    assert_eq!(utils::output_path(&path), dir.path().join("captureout.csv"));
}
