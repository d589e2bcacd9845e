use crate::analyser::containers::Message;
use regex::Regex;

/// Keeps messages whose address and payload match the given patterns.
/// Patterns are anchored at the start of the field, not the end.
#[derive(Debug, Default)]
pub struct MessageFilter {
    address: Option<Regex>,
    data: Option<Regex>,
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

impl MessageFilter {
    pub fn new(address_re: Option<&str>, data_re: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            address: address_re.map(anchored).transpose()?,
            data: data_re.map(anchored).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_none() && self.data.is_none()
    }

    pub fn matches(&self, message: &Message) -> bool {
        let address_ok = self.address.as_ref().map_or(true, |re| re.is_match(message.address()));
        let data_ok = self.data.as_ref().map_or(true, |re| re.is_match(&message.data()));
        address_ok && data_ok
    }

    pub fn apply(&self, messages: Vec<Message>) -> Vec<Message> {
        if self.is_empty() {
            return messages;
        }
        let before = messages.len();
        let kept: Vec<Message> = messages.into_iter().filter(|m| self.matches(m)).collect();
        log::info!("Filter kept {} of {before} messages.", kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::containers::tests::packet;
    use crate::analyser::containers::Direction;

    fn messages() -> Vec<Message> {
        vec![
            Message::single(packet(0.0, "20", Direction::Write, "01 6B 02", "")),
            Message::single(packet(0.1, "22", Direction::Write, "00 02 03", "")),
            Message::single(packet(0.2, "18", Direction::Write, "30", "N")),
        ]
    }

    #[test]
    fn address_pattern_is_anchored_at_start() {
        let filter = MessageFilter::new(Some("2"), None).unwrap();
        let kept = filter.apply(messages());
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|m| m.address().starts_with('2')));
    }

    #[test]
    fn data_pattern_combines_with_address() {
        let filter = MessageFilter::new(Some("2."), Some("00")).unwrap();
        let kept = filter.apply(messages());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].address(), "22");
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(MessageFilter::default().apply(messages()).len(), 3);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(MessageFilter::new(Some("("), None).is_err());
    }
}
