//! The stateful classifier.
//! Remembers, per address and subcommand, what the last exchange looked like and when
//! the next one is due, and scores every message against that prediction.
use super::containers::{Confidence, Message};
use super::rules;
use std::fmt;

/// Arrivals this much before the window still count as slightly off.
pub const EARLY_SLACK_S: f64 = 0.001;
/// Arrivals this much after the window still count as slightly off.
pub const LATE_SLACK_S: f64 = 0.1;

/// Absolute-time interval `[lo, hi]` (seconds) in which the next occurrence is due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    pub lo: f64,
    pub hi: f64,
}

impl Window {
    /// Before anything has been seen, any arrival in the first 100 s is on time.
    pub const INITIAL: Window = Window { lo: 0.0, hi: 100.0 };

    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Predicts the next arrival after `t0`: 80% of the nominal delay at the earliest,
    /// 120% at the latest unless an explicit ceiling is given.
    pub fn next(t0: f64, expected_ms: f64, max_ms: Option<f64>) -> Self {
        let lo = t0 + 0.8 * expected_ms / 1000.0;
        let hi = match max_ms {
            Some(max_ms) => t0 + max_ms / 1000.0,
            None => t0 + 1.2 * expected_ms / 1000.0,
        };
        Self { lo, hi }
    }

    pub fn timeliness(&self, t: f64) -> Confidence {
        if self.lo <= t && t <= self.hi {
            Confidence::Expected
        } else if self.lo - EARLY_SLACK_S <= t && t <= self.hi + LATE_SLACK_S {
            Confidence::TimingSlightlyOff
        } else {
            Confidence::TimingWayOff
        }
    }
}

pub fn timeliness(t: f64, window: Window) -> Confidence {
    window.timeliness(t)
}

pub fn next_window(t0: f64, expected_ms: f64, max_ms: Option<f64>) -> Window {
    Window::next(t0, expected_ms, max_ms)
}

/// One independently testable piece of the model. A rule owns whatever it needs to
/// remember about its key and records its verdicts on the message through
/// [Message::score].
pub trait Rule: fmt::Debug {
    fn name(&self) -> &'static str;
    fn evaluate(&mut self, message: &mut Message);
}

/// Which messages on an address a rule is responsible for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Any,
    /// Any fused write/read exchange.
    Fused,
    /// Fused exchange whose request payload is exactly this.
    Request(&'static str),
    /// Fused exchange whose request payload starts with this.
    RequestPrefix(&'static str),
    /// Fused exchange whose combined payload is exactly this.
    Payload(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selector {
    pub address: &'static str,
    pub shape: Shape,
}

impl Selector {
    pub fn new(address: &'static str, shape: Shape) -> Self {
        Self { address, shape }
    }

    pub fn matches(&self, message: &Message) -> bool {
        if message.address() != self.address {
            return false;
        }
        match self.shape {
            Shape::Any => true,
            Shape::Fused => message.is_fused(),
            Shape::Request(r) => message.is_fused() && message.request().data == r,
            Shape::RequestPrefix(r) => message.is_fused() && message.request().data.starts_with(r),
            Shape::Payload(p) => message.is_fused() && message.data() == p,
        }
    }
}

/// Registry of rules, consulted in registration order; the first selector that
/// matches a message owns it. Messages no selector matches keep the default score.
#[derive(Debug, Default)]
pub struct ExpectationModel {
    rules: Vec<(Selector, Box<dyn Rule>)>,
}

impl ExpectationModel {
    /// A model with no rules at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A model loaded with the rules known for this bus.
    pub fn standard() -> Self {
        let mut model = Self::empty();
        rules::register_standard(&mut model);
        model
    }

    pub fn register(&mut self, selector: Selector, rule: Box<dyn Rule>) {
        self.rules.push((selector, rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Scores one message. Messages must arrive in capture order.
    pub fn rate(&mut self, mut message: Message) -> Message {
        if let Some((_, rule)) = self.rules.iter_mut().find(|(s, _)| s.matches(&message)) {
            rule.evaluate(&mut message);
            if message.known() < Confidence::Expected {
                log::debug!(
                    "{:.6} {} {} scored {} by {}: {}",
                    message.time_s(),
                    message.address(),
                    message.data(),
                    message.known(),
                    rule.name(),
                    message.comment()
                );
            }
        }
        message
    }

    pub fn rate_all(&mut self, messages: Vec<Message>) -> Vec<Message> {
        log::info!("Rating {} messages.", messages.len());
        let rated: Vec<Message> = messages.into_iter().map(|m| self.rate(m)).collect();
        let unexpected = rated.iter().filter(|m| m.known() < Confidence::Expected).count();
        log::info!("{unexpected} of {} messages were not fully expected.", rated.len());
        rated
    }
}
