//! Contains utilities and helper functions that aid in capture loading.
use super::containers::{Ack, ByteRow, Direction};
use super::error::{CaptureError, Result};
use std::io::Read;
use std::path::Path;

/// Column layout of the logic analyser's I2C export:
/// `Time [s],Packet ID,Address,Data,Read/Write,ACK/NAK`
const COLUMNS: usize = 6;

/// Strips the `0x` prefix from an analyser hex field and keeps the two digits.
fn strip_hex(field: &str) -> Option<&str> {
    let digits = field.trim().strip_prefix("0x").or_else(|| field.trim().strip_prefix("0X"))?;
    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits)
}

/// Turns one CSV record into a [ByteRow].
///
/// Addresses are lower-cased and data bytes upper-cased so payload strings compare
/// the same regardless of how the analyser was configured.
/// Direction and ack are truncated to their first letter (`Write` -> `W`, `NAK` -> `N`).
pub fn parse_row(record: &csv::StringRecord, line: u64) -> Result<ByteRow> {
    let invalid = |reason: String| CaptureError::InvalidRow { line, reason };

    if record.len() != COLUMNS {
        return Err(invalid(format!("expected {COLUMNS} columns, found {}", record.len())));
    }

    let time_s = record[0]
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(format!("bad time {:?}: {e}", &record[0])))?;
    let packet_id = record[1].trim();
    let address =
        strip_hex(&record[2]).ok_or_else(|| invalid(format!("bad address {:?}", &record[2])))?;
    let data = strip_hex(&record[3]).ok_or_else(|| invalid(format!("bad data {:?}", &record[3])))?;
    let rw = record[4]
        .trim()
        .chars()
        .next()
        .and_then(Direction::from_char)
        .ok_or_else(|| invalid(format!("bad direction {:?}", &record[4])))?;
    let ack = record[5]
        .trim()
        .chars()
        .next()
        .and_then(Ack::from_char)
        .ok_or_else(|| invalid(format!("bad ack {:?}", &record[5])))?;

    Ok(ByteRow::new(
        time_s,
        packet_id,
        &address.to_ascii_lowercase(),
        &data.to_ascii_uppercase(),
        rw,
        ack,
    ))
}

/// Reads byte rows from any CSV source. The first line is the header and is skipped.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<ByteRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(parse_row(&record, line)?);
    }

    Ok(rows)
}

/// Loads a capture file exported by the logic analyser.
pub fn load_file(filepath: &Path) -> Result<Vec<ByteRow>> {
    log::info!("Loading capture file {}.", filepath.display());
    let file = std::fs::File::open(filepath)?;
    let rows = read_rows(file)?;
    log::info!("Read {} byte rows.", rows.len());

    if rows.windows(2).any(|w| w[1].time_s < w[0].time_s) {
        log::warn!("Capture rows are not in time order; timing predictions will be unreliable.");
    }

    Ok(rows)
}

/// Output path for a capture's results: `X.csv` -> `Xout.csv`.
pub fn output_path(filepath: &Path) -> std::path::PathBuf {
    let name = filepath.to_string_lossy();
    let stem = name.strip_suffix(".csv").unwrap_or(&name);
    std::path::PathBuf::from(format!("{stem}out.csv"))
}
