//! Folds byte rows into [Packet]s, one per transaction id.
use super::containers::{Ack, ByteRow, Direction, Packet};
use super::error::{CaptureError, Result};
use std::collections::HashMap;

/// Maps each distinct payload string to a small integer, in first-seen order.
#[derive(Debug, Default)]
pub struct PayloadIds {
    ids: HashMap<String, u32>,
}

impl PayloadIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `data`, assigning the next one if it is new. Ids start at 1.
    pub fn id_for(&mut self, data: &str) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(data.to_string()).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Hex sum of every byte but the last, which is a framing byte on this bus.
pub fn checksum(data: &[&str]) -> String {
    let body = &data[..data.len().saturating_sub(1)];
    let sum: u64 = body
        .iter()
        .filter_map(|d| u8::from_str_radix(d, 16).ok())
        .map(u64::from)
        .sum();
    format!("{sum:X}")
}

/// Canonical acks are all-ack for a write, and all-ack then a final nack for a read.
/// Those collapse to an empty string; anything else is kept as-is.
pub fn compress_ack(rw: Direction, acks: &[Ack]) -> String {
    let ack_string: String = acks.iter().map(Ack::as_char).collect();
    let canonical = match rw {
        Direction::Write => acks.iter().all(|a| *a == Ack::Ack),
        Direction::Read => match acks.split_last() {
            Some((last, rest)) => *last == Ack::Nack && rest.iter().all(|a| *a == Ack::Ack),
            None => false,
        },
    };

    if canonical {
        String::new()
    } else {
        ack_string
    }
}

/// Reassembles transactions for one capture. The payload id table lives as long as
/// the assembler, so build a fresh one per capture.
#[derive(Debug, Default)]
pub struct PacketAssembler {
    data_ids: PayloadIds,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_ids(&self) -> &PayloadIds {
        &self.data_ids
    }

    /// Summarises one transaction's rows. All rows must share id, address and direction.
    pub fn summarize(&mut self, rows: &[ByteRow]) -> Result<Packet> {
        let b0 = rows.first().ok_or_else(|| CaptureError::MalformedCapture {
            packet_id: String::new(),
            reason: "empty transaction".to_string(),
        })?;
        let malformed = |reason: String| CaptureError::MalformedCapture {
            packet_id: b0.packet_id.clone(),
            reason,
        };

        if let Some(row) = rows.iter().find(|r| r.packet_id != b0.packet_id) {
            return Err(malformed(format!(
                "mixed transaction ids {} and {}",
                b0.packet_id, row.packet_id
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.address != b0.address) {
            return Err(malformed(format!("mixed addresses {} and {}", b0.address, row.address)));
        }
        if let Some(row) = rows.iter().find(|r| r.rw != b0.rw) {
            return Err(malformed(format!("mixed directions {} and {}", b0.rw, row.rw)));
        }

        let data: Vec<&str> = rows.iter().map(|r| r.data.as_str()).collect();
        let data_string = data.join(" ");
        let dataid = self.data_ids.id_for(&data_string);
        let acks: Vec<Ack> = rows.iter().map(|r| r.ack).collect();

        Ok(Packet {
            time_s: b0.time_s,
            packet_id: b0.packet_id.clone(),
            address: b0.address.clone(),
            rw: b0.rw,
            lendata: rows.len(),
            dataid,
            datasum: checksum(&data),
            data: data_string,
            ack: compress_ack(b0.rw, &acks),
        })
    }

    /// Splits the row stream into runs of equal transaction id and summarises each.
    pub fn assemble(&mut self, rows: &[ByteRow]) -> Result<Vec<Packet>> {
        log::info!("Assembling {} rows into packets.", rows.len());
        let mut packets = Vec::new();
        let mut start = 0;

        for i in 1..=rows.len() {
            if i == rows.len() || rows[i].packet_id != rows[start].packet_id {
                packets.push(self.summarize(&rows[start..i])?);
                start = i;
            }
        }

        log::info!(
            "Assembled {} packets with {} distinct payloads.",
            packets.len(),
            self.data_ids.len()
        );
        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t: f64, id: &str, addr: &str, data: &str, rw: Direction, ack: Ack) -> ByteRow {
        ByteRow::new(t, id, addr, data, rw, ack)
    }

    #[test]
    fn folds_one_write_transaction() {
        let rows = vec![
            row(0.1, "7", "20", "01", Direction::Write, Ack::Ack),
            row(0.2, "7", "20", "6B", Direction::Write, Ack::Ack),
        ];
        let packets = PacketAssembler::new().assemble(&rows).unwrap();
        assert_eq!(packets.len(), 1);
        let p = &packets[0];
        assert_eq!(p.data, "01 6B");
        assert_eq!(p.ack, "");
        assert_eq!(p.lendata, 2);
        assert_eq!(p.time_s, 0.1);
        assert_eq!(p.dataid, 1);
        assert_eq!(p.datasum, "1");
    }

    #[test]
    fn repeated_payloads_share_ids() {
        let rows = vec![
            row(0.0, "1", "18", "30", Direction::Write, Ack::Nack),
            row(0.1, "2", "3e", "7C", Direction::Write, Ack::Nack),
            row(0.2, "3", "18", "30", Direction::Write, Ack::Nack),
        ];
        let mut assembler = PacketAssembler::new();
        let packets = assembler.assemble(&rows).unwrap();
        let ids: Vec<u32> = packets.iter().map(|p| p.dataid).collect();
        assert_eq!(ids, vec![1, 2, 1]);
        assert_eq!(assembler.data_ids().len(), 2);
    }

    #[test]
    fn mixed_address_is_fatal() {
        let rows = vec![
            row(0.0, "1", "20", "01", Direction::Write, Ack::Ack),
            row(0.1, "1", "21", "02", Direction::Write, Ack::Ack),
        ];
        let err = PacketAssembler::new().assemble(&rows).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::MalformedCapture { ref packet_id, .. } if packet_id == "1"
        ));
    }

    #[test]
    fn mixed_direction_is_fatal() {
        let rows = vec![
            row(0.0, "1", "20", "01", Direction::Write, Ack::Ack),
            row(0.1, "1", "20", "02", Direction::Read, Ack::Nack),
        ];
        assert!(PacketAssembler::new().assemble(&rows).is_err());
    }

    #[test]
    fn checksum_skips_last_byte() {
        assert_eq!(checksum(&["5A", "7F", "00", "00", "C0", "17", "F2"]), "1B0");
        assert_eq!(checksum(&["30"]), "0");
    }

    #[test]
    fn ack_compression_per_direction() {
        use crate::analyser::containers::Ack::{Ack as A, Nack as N};
        assert_eq!(compress_ack(Direction::Write, &[A, A, A]), "");
        assert_eq!(compress_ack(Direction::Write, &[N]), "N");
        assert_eq!(compress_ack(Direction::Read, &[A, A, N]), "");
        assert_eq!(compress_ack(Direction::Read, &[A, A, A]), "AAA");
        assert_eq!(compress_ack(Direction::Read, &[N, A, N]), "NAN");
    }
}
