//! Bitwise difference view between two payload strings.
use std::fmt;

/// Result of comparing two payloads byte by byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BitDiff {
    /// Same shape as the inputs: unchanged bytes are blank, changed bytes hold the XOR.
    Changed(String),
    /// Payloads of different lengths have no position-wise diff.
    LengthMismatch,
    /// One side is missing or isn't hex.
    Incomparable,
}

impl BitDiff {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, BitDiff::Changed(s) if s.chars().all(|c| c == ' ' || c == '>'))
    }
}

impl fmt::Display for BitDiff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BitDiff::Changed(s) => write!(f, "{s}"),
            BitDiff::LengthMismatch => Ok(()),
            BitDiff::Incomparable => write!(f, "<can't compare>"),
        }
    }
}

fn parse_byte(pair: &str) -> Option<u8> {
    let bytes = hex::decode(pair).ok()?;
    match bytes.as_slice() {
        [b] => Some(*b),
        _ => None,
    }
}

/// Compares two space-separated hex payloads (fused payloads with `>` work too,
/// as long as both sides have the same shape).
pub fn compare_data(a: &str, b: &str) -> BitDiff {
    if a.is_empty() || b.is_empty() {
        return BitDiff::Incomparable;
    }
    if a.len() != b.len() {
        return BitDiff::LengthMismatch;
    }

    let mut rv = String::with_capacity(a.len());
    for (ta, tb) in a.split(' ').zip(b.split(' ')) {
        if !rv.is_empty() {
            rv.push(' ');
        }
        if ta == ">" && tb == ">" {
            rv.push('>');
            continue;
        }
        if ta == tb {
            rv.push_str(&" ".repeat(ta.len()));
            continue;
        }
        match (parse_byte(ta), parse_byte(tb)) {
            (Some(x), Some(y)) => rv.push_str(&format!("{:02X}", x ^ y)),
            // Same length but different separators, e.g. `>` against a byte.
            _ => return BitDiff::Incomparable,
        }
    }

    BitDiff::Changed(rv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differing_bytes_show_xor() {
        assert_eq!(compare_data("01 6B 02", "01 6A 02"), BitDiff::Changed("   01   ".to_string()));
        assert_eq!(compare_data("5A 00 00 00 5A", "5A 01 00 00 5B").to_string(), "   01       01");
    }

    #[test]
    fn equal_payloads_are_blank() {
        let diff = compare_data("5A 7F 00", "5A 7F 00");
        assert_eq!(diff, BitDiff::Changed("        ".to_string()));
        assert!(diff.is_unchanged());
    }

    #[test]
    fn length_mismatch_renders_empty() {
        let diff = compare_data("01 02", "01 02 03");
        assert_eq!(diff, BitDiff::LengthMismatch);
        assert_eq!(diff.to_string(), "");
    }

    #[test]
    fn empty_side_cannot_be_compared() {
        assert_eq!(compare_data("", "01"), BitDiff::Incomparable);
        assert_eq!(compare_data("01", ""), BitDiff::Incomparable);
        assert_eq!(compare_data("", "").to_string(), "<can't compare>");
    }

    #[test]
    fn fused_payloads_keep_separator() {
        let diff = compare_data("00 02 03 > 5A 00", "00 02 03 > 5A 04");
        assert_eq!(diff.to_string(), format!("{}>{}04", " ".repeat(9), " ".repeat(4)));
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn non_hex_is_incomparable() {
        assert_eq!(compare_data("0G", "01"), BitDiff::Incomparable);
    }
}
