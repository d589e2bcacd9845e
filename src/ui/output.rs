use crate::analyser::containers::{Confidence, Message, MessageRecord};
use crate::analyser::error::Result;
use ansi_term::{Colour, Style};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Payloads seen fewer times than this are summarised by their request alone.
const RARE_PAYLOAD_COUNT: usize = 10;

fn style_for(known: Confidence) -> Style {
    match known {
        Confidence::NotUnderstood => Style::new().on(Colour::Red),
        Confidence::Unclassified => Style::new().fg(Colour::White),
        Confidence::TimingWayOff => Style::new().fg(Colour::Red),
        Confidence::StateChanged => Style::new().fg(Colour::Yellow),
        Confidence::TimingSlightlyOff => Style::new().fg(Colour::Blue),
        Confidence::Expected => Style::new().fg(Colour::Green),
    }
}

/// One display line per message, coloured by how expected it was.
pub fn format_message(message: &Message, prev_time_s: f64) -> String {
    format!(
        "{:.3} +{:.3} {} {:>2} {} {} {} {}",
        message.time_s(),
        message.time_s() - prev_time_s,
        message.address(),
        message.rw(),
        message.ack(),
        message.data(),
        "*".repeat(message.known().level() as usize),
        message.comment()
    )
}

pub fn print_messages(messages: &[Message], hide_known: bool) {
    let mut prev_time_s = 0.0;
    for m in messages {
        if hide_known && m.known() >= Confidence::Expected {
            continue;
        }
        println!("{}", style_for(m.known()).paint(format_message(m, prev_time_s)));
        prev_time_s = m.time_s();
    }
}

/// Raw payloads longer than a single byte, without decoration.
pub fn dump_messages(messages: &[Message]) {
    for m in messages {
        let data = m.data();
        if data.len() > 3 {
            println!("{data}");
        }
    }
}

/// What makes two messages "the same kind" for the summaries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageType {
    pub address: String,
    pub rw: String,
    pub ack: String,
    pub data: String,
    pub known: Confidence,
}

fn message_types(messages: &[Message]) -> Vec<(f64, MessageType)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for m in messages {
        *counts.entry(m.data()).or_insert(0) += 1;
    }

    messages
        .iter()
        .map(|m| {
            let full = m.data();
            let data = if counts[&full] < RARE_PAYLOAD_COUNT {
                m.request().data.clone()
            } else {
                full
            };
            let mtype = MessageType {
                address: m.address().to_string(),
                rw: m.rw(),
                ack: m.ack(),
                data,
                known: m.known(),
            };
            (m.time_s(), mtype)
        })
        .collect()
}

/// A run of consecutive messages of one type.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRun {
    pub start_s: f64,
    pub end_s: f64,
    pub count: usize,
    pub mtype: MessageType,
}

impl std::fmt::Display for SummaryRun {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "From {:.3} to {:.3} {:4} messages of {}: {} {} {}",
            self.start_s,
            self.end_s,
            self.count,
            self.mtype.address,
            self.mtype.rw,
            self.mtype.data,
            self.mtype.known
        )
    }
}

pub fn time_summary(messages: &[Message]) -> Vec<SummaryRun> {
    let mut typed = message_types(messages);
    typed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut runs: Vec<SummaryRun> = Vec::new();
    for (time_s, mtype) in typed {
        match runs.last_mut() {
            Some(run) if run.mtype == mtype => {
                run.end_s = time_s;
                run.count += 1;
            }
            _ => runs.push(SummaryRun {
                start_s: time_s,
                end_s: time_s,
                count: 1,
                mtype,
            }),
        }
    }
    runs
}

pub fn print_time_summary(messages: &[Message]) {
    for run in time_summary(messages) {
        println!("{run}");
    }
}

/// One point of the timeline chart: x is time, y is the message type's row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub x: f64,
    pub y: usize,
    pub value: String,
}

/// Timeline rows ordered by payload length, then payload.
pub fn timeline_points(messages: &[Message]) -> Vec<TimelinePoint> {
    let mut times_by_type: HashMap<MessageType, Vec<f64>> = HashMap::new();
    for (time_s, mtype) in message_types(messages) {
        times_by_type.entry(mtype).or_default().push(time_s);
    }

    let mut types: Vec<_> = times_by_type.into_iter().collect();
    types.sort_by(|(a, _), (b, _)| {
        (a.data.len(), &a.data, &a.address, &a.rw, &a.ack, a.known)
            .cmp(&(b.data.len(), &b.data, &b.address, &b.rw, &b.ack, b.known))
    });

    let mut points = Vec::new();
    for (y, (mtype, mut times)) in types.into_iter().enumerate() {
        times.sort_by(f64::total_cmp);
        let value = format!("{} {} {}", mtype.address, mtype.rw, mtype.data);
        points.extend(times.into_iter().map(|x| TimelinePoint { x, y, value: value.clone() }));
    }
    points
}

pub fn data_as_json(points: &[TimelinePoint]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(points)
}

pub fn data_to_file(data: String, path: &Path) -> Result<()> {
    std::fs::write(path, data)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Writes one CSV row per message, including its score and comment.
pub fn save_messages(path: &Path, messages: &[Message]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    for m in messages {
        let record: MessageRecord = m.record();
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    log::info!("Saved {} messages to {}", messages.len(), path.display());
    Ok(())
}
