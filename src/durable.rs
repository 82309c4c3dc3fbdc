//! ==============================================================================
//! durable.rs - Remote Append-Only Logger
//! ==============================================================================
//!
//! purpose:
//!     appends {timestamp, readings, mood} entries to the remote log store
//!     over HTTP, at most once per long interval (default 15 minutes).
//!
//! delivery contract:
//!     - the gate is keyed on the last ATTEMPT, success or failure; a
//!       failed attempt never retries sooner. no backoff, no queueing.
//!       a failed entry is permanently lost, and that is accepted.
//!     - fails closed: when offline the attempt is recorded as failed
//!       without touching the network.
//!     - success = any response with status below 400 (informational and
//!       redirect codes count; "no response" does not).
//!
//! relationships:
//!     - used by: sched.rs (conditional log each tick)
//!     - uses: reqwest for the POST, mood.rs for the wire name
//!
//! ==============================================================================

use serde::Serialize;
use tracing::{info, warn};

use crate::config::DurableConfig;
use crate::mood::Mood;
use crate::sensors::Observation;

/// body of one append: flat JSON, write-once
#[derive(Serialize)]
struct LogEntry {
    timestamp: i64,
    soil_raw: u16,
    light_raw: u16,
    temp_c: f32,
    hum: f32,
    mood: &'static str,
}

pub struct DurableLogger {
    client: reqwest::Client,
    url: String,
    interval_ms: u64,
    last_attempt_ms: u64,
}

impl DurableLogger {
    /// `now_ms` seeds the gate: the first entry goes out one full interval
    /// after startup.
    pub fn new(cfg: &DurableConfig, now_ms: u64) -> Self {
        let url = format!(
            "{}/plants/{}/logs.json",
            cfg.base_url.trim_end_matches('/'),
            cfg.plant_id
        );
        Self {
            client: reqwest::Client::new(),
            url,
            interval_ms: cfg.interval_ms,
            last_attempt_ms: now_ms,
        }
    }

    /// open only once the elapsed time strictly exceeds the interval
    fn due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_attempt_ms) > self.interval_ms
    }

    /// Attempt an append if the interval has elapsed. Returns None when the
    /// gate is closed, otherwise whether the attempt succeeded. The gate
    /// advances on every attempt, pass or fail.
    pub async fn maybe_log(
        &mut self,
        obs: &Observation,
        mood: Mood,
        online: bool,
        now_ms: u64,
    ) -> Option<bool> {
        if !self.due(now_ms) {
            return None;
        }
        self.last_attempt_ms = now_ms;

        let ok = if online {
            self.post(obs, mood).await
        } else {
            warn!("durable log skipped: offline");
            false
        };

        if ok {
            info!("durable log appended ({})", mood.wire_name());
        } else {
            warn!("durable log attempt failed; entry dropped");
        }
        Some(ok)
    }

    async fn post(&self, obs: &Observation, mood: Mood) -> bool {
        let entry = LogEntry {
            timestamp: obs.timestamp_ms as i64,
            soil_raw: obs.soil_raw,
            light_raw: obs.light_raw,
            temp_c: obs.temp_wire(),
            hum: obs.hum_wire(),
            mood: mood.wire_name(),
        };
        match self.client.post(&self.url).json(&entry).send().await {
            Ok(resp) => {
                let code = resp.status().as_u16();
                info!("log store POST: {}", code);
                code < 400
            }
            Err(e) => {
                warn!("log store POST error: {}", e);
                false
            }
        }
    }
}
