//! Per-address rules for the controllers seen on the bus.
//!
//! Known addresses:
//! - `20`: front control panel, polled for several registers
//! - `21`: probably a rear control panel
//! - `22`: lights
//! - `18`, `3e`, `36`, `44`: unknown, each answering a fixed byte with a nack
use super::containers::{Confidence, Message};
use super::core::{ExpectationModel, Rule, Selector, Shape, Window};
use super::diff::compare_data;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Typical polling period on this bus.
pub const POLL_MS: f64 = 80.0;

/// Latest a sentinel write may arrive after the previous one. The bus gets busy and
/// `36` in particular is often much slower than the usual cadence.
pub const SENTINEL_CEILING_MS: f64 = 500.0;

lazy_static! {
    /// Sentinel byte each status-style address writes.
    pub static ref SENTINELS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("18", "30");
        m.insert("3e", "7C");
        m.insert("36", "6C");
        m.insert("44", "88");
        m
    };
}

pub const LIGHT_ADDRESS: &str = "22";
pub const LIGHT_STATUS_REQUEST: &str = "00 02 03";
pub const LIGHT_INCREASE: &str = "00 00 02 03 01 44 > 5A 5A";
pub const LIGHT_DECREASE: &str = "00 00 02 02 01 45 > 5A 5A";
/// Light levels in the order "increase" steps through them.
pub const LIGHT_LEVELS: [&str; 6] = [
    "5A 00 00 00 5A",
    "5A 01 00 00 5B",
    "5A 02 00 00 58",
    "5A 03 00 00 59",
    "5A 04 00 00 5E",
    "5A 05 00 00 5F",
];

pub const PANEL_ADDRESS: &str = "20";
/// Register polls on the panel; the request names the register.
pub const PANEL_REGISTERS: [&str; 3] = ["01 6B 02", "01 39 06", "01 62 09"];
pub const PANEL_TIMED_WRITE: &str = "02 01 03";
pub const PANEL_HEARTBEAT: &str = "02 00 01 01 42 > 5A 5A";
pub const PANEL_UNTIMED_WRITE: &str = "01 3A 0A";

pub const REAR_ADDRESS: &str = "21";
pub const REAR_STATUS_REQUEST: &str = "01 48 05";
pub const REAR_INITIAL_RESPONSE: &str = "5A 7F 00 00 C0 17 F2";
pub const REAR_FOLLOW_UP: &str = "01 46 02 07 08 08 > 5A 5A";

/// Loads every known rule into `model`.
pub fn register_standard(model: &mut ExpectationModel) {
    let mut sentinels: Vec<_> = SENTINELS.iter().collect();
    sentinels.sort_by_key(|(address, _)| **address);
    for (address, sentinel) in sentinels {
        model.register(Selector::new(*address, Shape::Any), Box::new(SentinelRule::new(sentinel)));
    }

    model.register(Selector::new(REAR_ADDRESS, Shape::Any), Box::new(PollSequenceRule::new()));
    model.register(Selector::new(LIGHT_ADDRESS, Shape::Any), Box::new(LightingRule::new()));

    for register in PANEL_REGISTERS {
        model.register(
            Selector::new(PANEL_ADDRESS, Shape::Request(register)),
            Box::new(RegisterPollRule::new()),
        );
    }
    model.register(
        Selector::new(PANEL_ADDRESS, Shape::RequestPrefix(PANEL_TIMED_WRITE)),
        Box::new(WrittenStateRule::timed()),
    );
    model.register(
        Selector::new(PANEL_ADDRESS, Shape::Payload(PANEL_HEARTBEAT)),
        Box::new(HeartbeatRule::new()),
    );
    model.register(
        Selector::new(PANEL_ADDRESS, Shape::RequestPrefix(PANEL_UNTIMED_WRITE)),
        Box::new(WrittenStateRule::untimed()),
    );
    model.register(Selector::new(PANEL_ADDRESS, Shape::Fused), Box::new(RejectRule));

    log::debug!("Registered {} rules.", model.len());
}

/// A nacked write of one fixed byte, about every 80 ms.
#[derive(Debug)]
pub struct SentinelRule {
    sentinel: &'static str,
    window: Window,
}

impl SentinelRule {
    pub fn new(sentinel: &'static str) -> Self {
        Self {
            sentinel,
            window: Window::INITIAL,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }
}

impl Rule for SentinelRule {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let t = message.time_s();
        message.score(self.window.timeliness(t));
        self.window = Window::next(t, POLL_MS, Some(SENTINEL_CEILING_MS));

        if message.data() != self.sentinel {
            message.score(Confidence::NotUnderstood);
            message.set_comment(format!("Expecting {}", self.sentinel));
        }
        if message.ack() != "N" || message.rw() != "W" {
            message.score(Confidence::NotUnderstood);
            message.set_comment(format!("Expecting NACK write of {}", self.sentinel));
        }
    }
}

/// Polled register whose value may flip back and forth once without alarm.
#[derive(Debug)]
pub struct RegisterPollRule {
    prev: Option<String>,
    prevprev: Option<String>,
    window: Window,
}

impl RegisterPollRule {
    pub fn new() -> Self {
        Self {
            prev: None,
            prevprev: None,
            window: Window::INITIAL,
        }
    }
}

impl Default for RegisterPollRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RegisterPollRule {
    fn name(&self) -> &'static str {
        "register poll"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let Some(reply) = message.response().map(|p| p.data.clone()) else {
            message.score(Confidence::NotUnderstood);
            return;
        };
        let t = message.time_s();
        message.score(self.window.timeliness(t));

        if self.prev.as_deref() == Some(reply.as_str()) {
            message.score(Confidence::Expected);
        } else if self.prevprev.as_deref() == Some(reply.as_str()) {
            message.score(Confidence::Expected);
            message.set_comment("but only once");
        } else {
            message.score(Confidence::StateChanged);
            let diff = compare_data(self.prev.as_deref().unwrap_or(""), &reply);
            message.set_comment(format!("Changed bits {diff} to {reply}"));
        }

        self.prevprev = self.prev.replace(reply);
        self.window = Window::next(t, POLL_MS, None);
    }
}

/// Light controller: status polls, plus increase/decrease commands that step the
/// level through [LIGHT_LEVELS].
#[derive(Debug)]
pub struct LightingRule {
    state: String,
    window: Window,
}

impl LightingRule {
    pub fn new() -> Self {
        Self {
            state: LIGHT_LEVELS[0].to_string(),
            window: Window::INITIAL,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Moves one level up or down, wrapping at either end.
    fn step(&mut self, up: bool) -> bool {
        let Some(i) = LIGHT_LEVELS.iter().position(|l| *l == self.state) else {
            return false;
        };
        let n = LIGHT_LEVELS.len();
        let next = if up { (i + 1) % n } else { (i + n - 1) % n };
        self.state = LIGHT_LEVELS[next].to_string();
        true
    }
}

impl Default for LightingRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for LightingRule {
    fn name(&self) -> &'static str {
        "lighting"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let Some(reply) = message.response().map(|p| p.data.clone()) else {
            message.score(Confidence::NotUnderstood);
            return;
        };
        let t = message.time_s();
        message.score(self.window.timeliness(t));

        let data = message.data();
        if message.request().data == LIGHT_STATUS_REQUEST {
            if reply == self.state {
                message.score(Confidence::Expected);
            } else {
                message.score(Confidence::StateChanged);
                let diff = compare_data(&self.state, &reply);
                message.set_comment(format!("Data changed bits {diff} to {reply}"));
                self.state = reply;
            }
            self.window = Window::next(t, POLL_MS, None);
        } else if data == LIGHT_INCREASE || data == LIGHT_DECREASE {
            let up = data == LIGHT_INCREASE;
            message.score(Confidence::StateChanged);
            let verb = if up { "Increase" } else { "Decrease" };
            if self.step(up) {
                message.set_comment(format!("{verb} sent to light"));
            } else {
                message.set_comment(format!(
                    "{verb} sent to light from unknown level {}",
                    self.state
                ));
            }
            self.window = Window::next(t, 3.0, None);
        } else {
            message.score(Confidence::NotUnderstood);
        }
    }
}

/// Panel write whose content only matters when it changes.
#[derive(Debug)]
pub struct WrittenStateRule {
    state: Option<String>,
    window: Option<Window>,
}

impl WrittenStateRule {
    /// Also expected on the regular polling cadence.
    pub fn timed() -> Self {
        Self {
            state: None,
            window: Some(Window::INITIAL),
        }
    }

    pub fn untimed() -> Self {
        Self {
            state: None,
            window: None,
        }
    }
}

impl Rule for WrittenStateRule {
    fn name(&self) -> &'static str {
        "written state"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let t = message.time_s();
        if let Some(window) = self.window {
            message.score(window.timeliness(t));
            self.window = Some(Window::next(t, POLL_MS, None));
        }

        let data = message.data();
        if self.state.as_deref() == Some(data.as_str()) {
            message.score(Confidence::Expected);
        } else {
            message.score(Confidence::StateChanged);
            message.set_comment(format!("New written data {data}"));
            self.state = Some(data);
        }
    }
}

/// Fixed exchange whose only interesting property is its timing.
#[derive(Debug)]
pub struct HeartbeatRule {
    window: Window,
}

impl HeartbeatRule {
    pub fn new() -> Self {
        Self { window: Window::INITIAL }
    }
}

impl Default for HeartbeatRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for HeartbeatRule {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let t = message.time_s();
        message.score(self.window.timeliness(t));
        self.window = Window::next(t, POLL_MS, None);
    }
}

/// Status request and a follow-up command, alternating. A 6-byte write announces
/// that the status exchange is due about 50 ms later.
#[derive(Debug)]
pub struct PollSequenceRule {
    expected: String,
    response: String,
    window: Window,
}

impl PollSequenceRule {
    pub fn new() -> Self {
        Self {
            expected: Self::first_expected(),
            response: REAR_INITIAL_RESPONSE.to_string(),
            window: Window::INITIAL,
        }
    }

    fn first_expected() -> String {
        format!("{REAR_STATUS_REQUEST} > {REAR_INITIAL_RESPONSE}")
    }
}

impl Default for PollSequenceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PollSequenceRule {
    fn name(&self) -> &'static str {
        "poll sequence"
    }

    fn evaluate(&mut self, message: &mut Message) {
        let t = message.time_s();
        let Some(reply) = message.response().map(|p| p.data.clone()) else {
            message.score(Confidence::NotUnderstood);
            self.expected = Self::first_expected();
            self.window = Window::next(t, POLL_MS, None);
            return;
        };

        message.score(self.window.timeliness(t));
        if message.data() != self.expected {
            message.score(Confidence::StateChanged);
        }

        if message.lendata() == 6 {
            self.window = Window::new(t + 0.045, t + 0.055);
            self.expected = format!("{REAR_STATUS_REQUEST} > {}", self.response);
        } else if message.request().data == REAR_STATUS_REQUEST {
            if reply != self.response {
                let diff = compare_data(&self.response, &reply);
                message.set_comment(format!("Data changed bits {diff} to {reply}"));
                self.response = reply;
            }
            self.window = Window::next(t, 30.0, None);
            self.expected = REAR_FOLLOW_UP.to_string();
        }
    }
}

/// Catch-all for shapes an address is known for but this one isn't.
#[derive(Debug)]
pub struct RejectRule;

impl Rule for RejectRule {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn evaluate(&mut self, message: &mut Message) {
        message.score(Confidence::NotUnderstood);
        message.set_comment("Unrecognised exchange");
    }
}
