use serde::Serialize;
use std::fmt;

/// Transfer direction of a single bus transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Direction::Read),
            'W' => Some(Direction::Write),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Direction::Read => 'R',
            Direction::Write => 'W',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ack {
    Ack,
    Nack,
}

impl Ack {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Ack::Ack),
            'N' => Some(Ack::Nack),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Ack::Ack => 'A',
            Ack::Nack => 'N',
        }
    }
}

/// One byte on the wire, as exported by the logic analyser.
#[derive(Clone, Debug, PartialEq)]
pub struct ByteRow {
    pub time_s: f64,
    pub packet_id: String,
    pub address: String,
    pub data: String,
    pub rw: Direction,
    pub ack: Ack,
}

impl ByteRow {
    pub fn new(
        time_s: f64,
        packet_id: &str,
        address: &str,
        data: &str,
        rw: Direction,
        ack: Ack,
    ) -> Self {
        Self {
            time_s,
            packet_id: packet_id.to_string(),
            address: address.to_string(),
            data: data.to_string(),
            rw,
            ack,
        }
    }
}

/// A reassembled transaction: every byte sharing one transaction id.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub time_s: f64,
    pub packet_id: String,
    pub address: String,
    pub rw: Direction,
    pub lendata: usize,
    /// Shared by every packet carrying the same payload string.
    pub dataid: u32,
    /// Hex bytes joined by single spaces, e.g. `"01 6B 02"`.
    pub data: String,
    pub datasum: String,
    /// Empty when the ack pattern is the canonical one for `rw`.
    pub ack: String,
}

/// Score given to a message by the classifier, from least to most expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Confidence {
    NotUnderstood = 0,
    Unclassified = 1,
    TimingWayOff = 2,
    StateChanged = 3,
    TimingSlightlyOff = 4,
    Expected = 5,
}

impl Confidence {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Unclassified
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// One logical exchange: a lone packet, or a write followed by the read it requested.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    packets: Vec<Packet>,
    known: Confidence,
    /// Set by the first verdict; from then on `known` can only go down.
    rated: bool,
    comment: String,
}

impl Message {
    pub fn single(packet: Packet) -> Self {
        Self {
            packets: vec![packet],
            known: Confidence::default(),
            rated: false,
            comment: String::new(),
        }
    }

    pub fn pair(write: Packet, read: Packet) -> Self {
        Self {
            packets: vec![write, read],
            known: Confidence::default(),
            rated: false,
            comment: String::new(),
        }
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    fn first(&self) -> &Packet {
        &self.packets[0]
    }

    /// The request half of a fused exchange, or the only packet.
    pub fn request(&self) -> &Packet {
        self.first()
    }

    /// The read half of a fused exchange.
    pub fn response(&self) -> Option<&Packet> {
        self.packets.get(1)
    }

    pub fn is_fused(&self) -> bool {
        self.packets.len() == 2
    }

    pub fn time_s(&self) -> f64 {
        self.first().time_s
    }

    pub fn packet_id(&self) -> &str {
        &self.first().packet_id
    }

    pub fn address(&self) -> &str {
        &self.first().address
    }

    pub fn lendata(&self) -> usize {
        self.first().lendata
    }

    pub fn dataid(&self) -> u32 {
        self.first().dataid
    }

    pub fn datasum(&self) -> &str {
        &self.first().datasum
    }

    pub fn data(&self) -> String {
        self.packets.iter().map(|p| p.data.as_str()).collect::<Vec<_>>().join(" > ")
    }

    pub fn rw(&self) -> String {
        self.packets.iter().map(|p| p.rw.as_char()).collect()
    }

    pub fn ack(&self) -> String {
        self.packets.iter().map(|p| p.ack.as_str()).collect()
    }

    pub fn known(&self) -> Confidence {
        self.known
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// True until some check has scored this message.
    pub fn is_baseline(&self) -> bool {
        !self.rated
    }

    /// Sets the confidence while it is still at its default. Returns false otherwise.
    pub fn set_baseline(&mut self, value: Confidence) -> bool {
        if self.rated {
            return false;
        }
        self.known = value;
        self.rated = true;
        true
    }

    /// Lowers the confidence to `value` unless it is already lower.
    pub fn lower_confidence_to(&mut self, value: Confidence) {
        self.known = self.known.min(value);
        self.rated = true;
    }

    /// Records one check's verdict. The first verdict sets the baseline and every
    /// later one can only pull it down, so the most anomalous verdict wins.
    pub fn score(&mut self, value: Confidence) {
        if !self.set_baseline(value) {
            self.lower_confidence_to(value);
        }
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn record(&self) -> MessageRecord {
        MessageRecord {
            time_s: self.time_s(),
            packet_id: self.packet_id().to_string(),
            address: self.address().to_string(),
            rw: self.rw(),
            lendata: self.lendata(),
            dataid: self.dataid(),
            data: self.data(),
            datasum: self.datasum().to_string(),
            ack: self.ack(),
            known: self.known.level(),
            comment: self.comment.clone(),
        }
    }
}

/// Flat row view of a [Message] for export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageRecord {
    #[serde(rename = "Time [s]")]
    pub time_s: f64,
    #[serde(rename = "Packet ID")]
    pub packet_id: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Read/Write")]
    pub rw: String,
    #[serde(rename = "Len")]
    pub lendata: usize,
    #[serde(rename = "DataId")]
    pub dataid: u32,
    #[serde(rename = "Data")]
    pub data: String,
    #[serde(rename = "Data sum")]
    pub datasum: String,
    #[serde(rename = "ACK/NAK")]
    pub ack: String,
    #[serde(rename = "Known")]
    pub known: u8,
    #[serde(rename = "Comment")]
    pub comment: String,
}
