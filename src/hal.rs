//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     provides a unified interface for the plant sensors (soil-moisture and
//!     light on an ADS1115 ADC, temperature/humidity on a DHT11).
//!     abstracts away the difference between running on a real Raspberry Pi
//!     (using `rppal`) and a development machine (using mocks).
//!
//! design philosophy:
//!     - "Compile Anywhere": The daemon should compile on Windows/Mac/Linux.
//!     - Mock by default; real hardware behind the `hardware` cargo feature.
//!
//! relationships:
//!     - used by: sensors.rs (raw readings), sched.rs / durable.rs (timestamps)
//!     - uses: rppal (on feature="hardware")
//!     - uses: python3/adafruit_dht subprocess for the DHT11 (bit-banging
//!       timing is unreliable in userspace without a kernel driver)
//!
//! ==============================================================================

use anyhow::Result;

use crate::config::SensorsConfig;

/// Raw access to the plant's sensors. One implementation per build flavor;
/// tests supply their own scripted implementations.
pub trait Hardware: Send + Sync {
    /// soil moisture, raw ADC units (0-4095, higher = wetter for resistive probes)
    fn read_soil_raw(&self) -> Result<u16>;
    /// ambient light, raw ADC units (0-4095)
    fn read_light_raw(&self) -> Result<u16>;
    /// combined temperature (C) / relative humidity (%) read.
    /// Err means the sensor faulted for this read; callers substitute sentinels.
    fn read_dht(&self) -> Result<(f32, f32)>;
}

/// unix epoch in milliseconds
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ==============================================================================================
// MOCK IMPLEMENTATION (For WSL / Non-Hardware Build)
// ==============================================================================================
#[cfg(not(feature = "hardware"))]
pub struct Hal {}

#[cfg(not(feature = "hardware"))]
impl Hal {
    pub fn new(_cfg: &SensorsConfig) -> Result<Self> {
        tracing::info!("Using MOCK HAL (No hardware access)");
        Ok(Self {})
    }
}

#[cfg(not(feature = "hardware"))]
impl Hardware for Hal {
    fn read_soil_raw(&self) -> Result<u16> {
        tracing::debug!("[MOCK ADC] soil channel read");
        Ok(2400)
    }

    fn read_light_raw(&self) -> Result<u16> {
        tracing::debug!("[MOCK ADC] light channel read");
        Ok(1300)
    }

    fn read_dht(&self) -> Result<(f32, f32)> {
        tracing::debug!("[MOCK DHT] read");
        Ok((22.5, 48.0)) // Mock data
    }
}

// ==============================================================================================
// REAL IMPLEMENTATION (For Raspberry Pi)
// ==============================================================================================
#[cfg(feature = "hardware")]
pub struct Hal {
    adc_addr: u8,
    soil_channel: u8,
    light_channel: u8,
    dht_pin: u8,
}

#[cfg(feature = "hardware")]
impl Hal {
    pub fn new(cfg: &SensorsConfig) -> Result<Self> {
        tracing::info!("Using REAL HARDWARE HAL (rppal)");
        Ok(Self {
            adc_addr: crate::config::parse_i2c_addr(&cfg.adc_i2c_address)?,
            soil_channel: cfg.soil_channel,
            light_channel: cfg.light_channel,
            dht_pin: cfg.dht_gpio_pin,
        })
    }

    /// single-shot ADS1115 conversion: AINx vs GND, +/-4.096V, 128 SPS
    fn read_adc_channel(&self, channel: u8) -> Result<u16> {
        use rppal::i2c::I2c;
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(self.adc_addr as u16)?;

        let cfg: u16 = 0x8000                       // OS: start conversion
            | ((0x4 + channel as u16) << 12)        // MUX: AINx vs GND
            | (0x1 << 9)                            // PGA: +/-4.096V
            | 0x0100                                // MODE: single shot
            | (0x4 << 5)                            // DR: 128 SPS
            | 0x3;                                  // comparator disabled
        i2c.write(&[0x01, (cfg >> 8) as u8, (cfg & 0xff) as u8])?;
        std::thread::sleep(std::time::Duration::from_millis(9));

        i2c.write(&[0x00])?;
        let mut buf = [0u8; 2];
        i2c.read(&mut buf)?;
        let raw = i16::from_be_bytes(buf).max(0) as u16;

        // scale the 15-bit single-ended result into the 0-4095 range the
        // mood thresholds are calibrated for
        Ok(raw >> 3)
    }
}

#[cfg(feature = "hardware")]
impl Hardware for Hal {
    fn read_soil_raw(&self) -> Result<u16> {
        self.read_adc_channel(self.soil_channel)
    }

    fn read_light_raw(&self) -> Result<u16> {
        self.read_adc_channel(self.light_channel)
    }

    fn read_dht(&self) -> Result<(f32, f32)> {
        use std::process::Command;
        let script = format!(
            r#"
import sys
try:
    import adafruit_dht
    import board
    import json

    dht = adafruit_dht.DHT11(board.D{})
    try:
        t, h = dht.temperature, dht.humidity
        if t is not None and h is not None:
            print(json.dumps({{"t": t, "h": h}}))
        else:
            print("null")
    finally:
        dht.exit()
except Exception as e:
    print(str(e), file=sys.stderr)
    sys.exit(1)
"#,
            self.dht_pin
        );
        let output = Command::new("python3").args(["-c", &script]).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("DHT11 read failed: {}", stderr.trim());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim() == "null" || stdout.trim().is_empty() {
            anyhow::bail!("DHT11 returned no data");
        }
        let v: serde_json::Value = serde_json::from_str(stdout.trim())?;
        let t = v["t"].as_f64().map(|x| x as f32);
        let h = v["h"].as_f64().map(|x| x as f32);
        match (t, h) {
            (Some(t), Some(h)) => Ok((t, h)),
            _ => anyhow::bail!("DHT11 returned malformed data: {}", stdout.trim()),
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_ms() {
        let ts = epoch_ms();
        // should be after 2024
        assert!(ts > 1700000000000, "timestamp should be after 2024");
    }

    // note: hardware tests require an actual pi and are not run in ci
    // #[test]
    // fn test_adc() {
    //     let hal = Hal::new(&crate::config::SensorsConfig::default()).unwrap();
    //     println!("soil: {:?}", hal.read_soil_raw());
    // }
}
