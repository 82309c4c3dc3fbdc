//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `config/plant.toml`.
//!     loads configuration from file or falls back to defaults.
//!     read once at startup; never hot-reloaded.
//!
//! structure:
//!     - PollingConfig: tick cadence of the main loop.
//!     - SensorsConfig: ADC address/channels and DHT pin.
//!     - DisplayConfig: OLED address and enable toggle.
//!     - LiveConfig: bind address for the viewer endpoint.
//!     - DurableConfig: remote log store URL, plant id, post interval.
//!     - NetConfig: connectivity probe and reconnect behavior.
//!
//! ==============================================================================

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct PlantConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub durable: DurableConfig,
    #[serde(default)]
    pub net: NetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorsConfig {
    /// ADS1115 address on the I2C bus, e.g. "0x48"
    pub adc_i2c_address: String,
    pub soil_channel: u8,
    pub light_channel: u8,
    pub dht_gpio_pin: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// SSD1306 address on the I2C bus, e.g. "0x3c"
    pub i2c_address: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    /// listen address for the WebSocket/api endpoint
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DurableConfig {
    /// base URL of the remote log store (no trailing path)
    pub base_url: String,
    pub plant_id: String,
    /// minimum gap between log attempts
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetConfig {
    /// host:port probed over TCP to decide "online"
    pub probe_addr: String,
    /// external command run to repair connectivity (e.g. nmcli); empty = none
    #[serde(default)]
    pub reconnect_cmd: Vec<String>,
    /// total budget for one reconnect attempt
    pub reconnect_timeout_ms: u64,
    /// probe poll interval while waiting for the link to come back
    pub reconnect_poll_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

/// parse "0x48"-style (or plain decimal) I2C addresses
pub fn parse_i2c_addr(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| anyhow::anyhow!("invalid I2C address: {:?}", s))
}

impl PlantConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: PlantConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("plant.toml"),
            std::path::PathBuf::from("..").join("config").join("plant.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│          PLANT BUDDY CONFIG             │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Tick: {}ms                            │", self.polling.tick_interval_ms);
        println!("│ Viewer endpoint: {}          │", self.live.bind);
        println!("│ Log store: {}/plants/{}", self.durable.base_url, self.durable.plant_id);
        println!("│ Log interval: {}ms                  │", self.durable.interval_ms);
        println!("│ Display: {}                         │", if self.display.enabled { "enabled" } else { "disabled" });
        println!("└─────────────────────────────────────────┘");
    }
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            sensors: SensorsConfig::default(),
            display: DisplayConfig::default(),
            live: LiveConfig::default(),
            durable: DurableConfig::default(),
            net: NetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 1000 }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            adc_i2c_address: "0x48".to_string(),
            soil_channel: 0,
            light_channel: 1,
            dht_gpio_pin: 4,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { i2c_address: "0x3c".to_string(), enabled: true }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            plant_id: "plant1".to_string(),
            interval_ms: 900_000, // 15 minutes
        }
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            probe_addr: "8.8.8.8:53".to_string(),
            reconnect_cmd: Vec::new(),
            reconnect_timeout_ms: 15_000,
            reconnect_poll_ms: 500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i2c_addr() {
        assert_eq!(parse_i2c_addr("0x48").unwrap(), 0x48);
        assert_eq!(parse_i2c_addr("0X3C").unwrap(), 0x3c);
        assert_eq!(parse_i2c_addr("72").unwrap(), 72);
        assert!(parse_i2c_addr("zz").is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_per_section() {
        let cfg: PlantConfig = toml::from_str(
            r#"
            [durable]
            base_url = "https://example.invalid"
            plant_id = "basil"
            interval_ms = 60000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.durable.plant_id, "basil");
        assert_eq!(cfg.durable.interval_ms, 60_000);
        // untouched sections keep their defaults
        assert_eq!(cfg.polling.tick_interval_ms, 1000);
        assert_eq!(cfg.net.reconnect_timeout_ms, 15_000);
    }
}
