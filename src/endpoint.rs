//! Per-provider endpoint configuration (spec §3, §6).
//!
//! `Endpoint` is consumed, not produced, by this crate — parsing it out of a
//! config file is explicitly out of scope (spec §1). It derives
//! `serde::Deserialize` with `#[serde(default)]` throughout so a bootstrap
//! can hand this crate a partially-specified struct (e.g. just
//! `contract_addresses` and `urls`) and have the rest filled in by
//! [`Endpoint::merge_defaults`].

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Whether a websocket keepalive ping is sent as a protocol-level ping frame
/// or as a text frame carrying [`Endpoint::ping_message`] (spec §4.4, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingType {
    Frame,
    Text,
}

impl Default for PingType {
    fn default() -> Self {
        PingType::Frame
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub name: String,
    pub urls: Vec<String>,
    pub websocket: Option<String>,
    pub websocket_path: String,
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    /// Zero means "no controller-initiated ping" (spec §4.4: rely on
    /// application-level ping/pong initiated by the server).
    #[serde(with = "duration_millis")]
    pub ping_duration: Duration,
    pub ping_type: PingType,
    pub ping_message: String,
    pub contract_addresses: HashMap<String, String>,
    /// Max block span per `eth_getLogs` request (spec §4.2, default 2000).
    pub volume_blocks: u64,
    #[serde(with = "duration_millis")]
    pub volume_pause: Duration,
    pub periods: Vec<String>,
    pub decimals: HashMap<String, u8>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint {
            name: String::new(),
            urls: Vec::new(),
            websocket: None,
            websocket_path: String::new(),
            poll_interval: Duration::from_secs(5),
            ping_duration: Duration::ZERO,
            ping_type: PingType::Frame,
            ping_message: String::new(),
            contract_addresses: HashMap::new(),
            volume_blocks: 2000,
            volume_pause: Duration::from_millis(200),
            periods: Vec::new(),
            decimals: HashMap::new(),
        }
    }
}

impl Endpoint {
    /// Fills any field left at its zero value in `self` with the
    /// corresponding field from `default` (the provider-specific default
    /// endpoint). `urls`/`name`/`websocket` are only overridden when empty.
    pub fn merge_defaults(mut self, default: &Endpoint) -> Endpoint {
        if self.name.is_empty() {
            self.name = default.name.clone();
        }
        if self.urls.is_empty() {
            self.urls = default.urls.clone();
        }
        if self.websocket.is_none() {
            self.websocket = default.websocket.clone();
        }
        if self.websocket_path.is_empty() {
            self.websocket_path = default.websocket_path.clone();
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = default.poll_interval;
        }
        if self.ping_duration.is_zero() {
            self.ping_duration = default.ping_duration;
        }
        if self.ping_message.is_empty() {
            self.ping_message = default.ping_message.clone();
        }
        if self.volume_blocks == 0 {
            self.volume_blocks = default.volume_blocks;
        }
        if self.volume_pause.is_zero() {
            self.volume_pause = default.volume_pause;
        }
        if self.periods.is_empty() {
            self.periods = default.periods.clone();
        }
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
