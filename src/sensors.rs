//! ==============================================================================
//! sensors.rs - Sensor Reader
//! ==============================================================================
//!
//! purpose:
//!     turns raw hardware reads into one typed Observation per tick.
//!     soil moisture is deliberately oversampled (burst of 10 reads, 10ms
//!     apart, arithmetic mean) to suppress high-frequency analog noise;
//!     light tolerates a single instantaneous sample.
//!
//! fault model:
//!     a failed DHT read is substituted with out-of-band sentinels
//!     (humidity -1, temperature -100) and surfaced downstream as data,
//!     not as an error. no retry within the tick; the fault is simply
//!     reported again each tick until it clears on its own.
//!
//! relationships:
//!     - uses: hal.rs (Hardware trait)
//!     - used by: sched.rs (one read per tick)
//!
//! ==============================================================================

use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::hal::Hardware;

pub const SOIL_SAMPLES: u32 = 10;
pub const SOIL_SAMPLE_GAP_MS: u64 = 10;

/// "reading unavailable" sentinels; out-of-band on purpose so no consumer
/// can mistake them for physical values
pub const HUM_SENTINEL: f32 = -1.0;
pub const TEMP_SENTINEL: f32 = -100.0;

/// One tick's worth of sensor state. Constructed fresh every tick and never
/// retained across ticks.
#[derive(Clone, Debug, Serialize)]
pub struct Observation {
    pub soil_raw: u16,
    pub light_raw: u16,
    /// celsius, or TEMP_SENTINEL when the DHT faulted
    pub temp_c: f32,
    /// relative humidity %, or HUM_SENTINEL when the DHT faulted
    pub hum_pct: f32,
    /// unix epoch ms at read time
    pub timestamp_ms: u64,
}

impl Observation {
    /// temperature as sent on the wire (1 decimal place)
    pub fn temp_wire(&self) -> f32 {
        (self.temp_c * 10.0).round() / 10.0
    }

    /// humidity as sent on the wire (whole percent)
    pub fn hum_wire(&self) -> f32 {
        self.hum_pct.round()
    }
}

/// Take one full observation. Blocks the tick for ~100ms of soil
/// oversampling; that is the only suspension point in here.
pub async fn read(hw: &dyn Hardware, now_ms: u64) -> Observation {
    let mut sum: u32 = 0;
    let mut got: u32 = 0;
    for i in 0..SOIL_SAMPLES {
        match hw.read_soil_raw() {
            Ok(v) => {
                sum += v as u32;
                got += 1;
            }
            Err(e) => warn!("soil sample {} failed: {}", i, e),
        }
        if i + 1 < SOIL_SAMPLES {
            tokio::time::sleep(Duration::from_millis(SOIL_SAMPLE_GAP_MS)).await;
        }
    }
    let soil_raw = if got > 0 { (sum / got) as u16 } else { 0 };

    let light_raw = match hw.read_light_raw() {
        Ok(v) => v,
        Err(e) => {
            warn!("light read failed: {}", e);
            0
        }
    };

    let (temp_c, hum_pct) = match hw.read_dht() {
        Ok((t, h)) if !t.is_nan() && !h.is_nan() => (t, h),
        Ok(_) => {
            warn!("DHT returned NaN");
            (TEMP_SENTINEL, HUM_SENTINEL)
        }
        Err(e) => {
            warn!("DHT read failed: {}", e);
            (TEMP_SENTINEL, HUM_SENTINEL)
        }
    };

    Observation { soil_raw, light_raw, temp_c, hum_pct, timestamp_ms: now_ms }
}
