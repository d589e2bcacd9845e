//! Pairs register writes with the read that follows them.
use super::containers::{Direction, Message, Packet};

/// Fuses a write immediately followed by a read on the same address into one
/// [Message]. Every other packet becomes a message on its own.
pub fn group_packets(packets: Vec<Packet>) -> Vec<Message> {
    log::info!("Grouping {} packets into messages.", packets.len());
    let mut out = Vec::with_capacity(packets.len());
    let mut pending: Option<Packet> = None;

    for p in packets {
        pending = match pending.take() {
            Some(pp)
                if pp.address == p.address
                    && pp.rw == Direction::Write
                    && p.rw == Direction::Read =>
            {
                out.push(Message::pair(pp, p));
                None
            }
            Some(pp) => {
                out.push(Message::single(pp));
                Some(p)
            }
            None => Some(p),
        };
    }
    if let Some(pp) = pending {
        out.push(Message::single(pp));
    }

    log::info!("Grouped into {} messages.", out.len());
    out
}

/// Wraps every packet as its own message, for runs that skip grouping.
pub fn singletons(packets: Vec<Packet>) -> Vec<Message> {
    packets.into_iter().map(Message::single).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::containers::tests::packet;

    #[test]
    fn fuses_write_then_read() {
        let packets = vec![
            packet(0.0, "20", Direction::Write, "01 6B 02", ""),
            packet(0.001, "20", Direction::Read, "5A 00", ""),
        ];
        let messages = group_packets(packets);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_fused());
        assert_eq!(messages[0].data(), "01 6B 02 > 5A 00");
        assert_eq!(messages[0].rw(), "WR");
    }

    #[test]
    fn consecutive_writes_never_fuse() {
        let packets = vec![
            packet(0.0, "20", Direction::Write, "01", ""),
            packet(0.1, "20", Direction::Write, "02", ""),
            packet(0.2, "20", Direction::Read, "03", ""),
        ];
        let messages = group_packets(packets);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].data(), "01");
        assert_eq!(messages[1].data(), "02 > 03");
    }

    #[test]
    fn lone_read_and_address_change_stay_single() {
        let packets = vec![
            packet(0.0, "21", Direction::Read, "01", ""),
            packet(0.1, "20", Direction::Write, "02", ""),
            packet(0.2, "22", Direction::Read, "03", ""),
            packet(0.3, "18", Direction::Write, "30", "N"),
        ];
        let messages = group_packets(packets);
        assert_eq!(messages.len(), 4);
        assert!(messages.iter().all(|m| !m.is_fused()));
        assert_eq!(messages[3].address(), "18");
    }

    #[test]
    fn empty_input() {
        assert!(group_packets(Vec::new()).is_empty());
    }
}
