//! ==============================================================================
//! display.rs - OLED Status Renderer
//! ==============================================================================
//!
//! purpose:
//!     owns the little SSD1306 status screen. redraws at most once per
//!     2000ms regardless of tick rate, via an internal last-render gate,
//!     so redraw cost stays decoupled from the scheduling tick.
//!
//! fault model:
//!     init probes the panel once at startup. if it is not there, a warning
//!     is logged and rendering stays disabled for the process lifetime.
//!     display loss is never fatal to sensing/broadcast/logging.
//!
//! relationships:
//!     - uses: mood.rs (glyph/label), sensors.rs (Observation)
//!     - used by: sched.rs (conditional render), main.rs (splash screens)
//!     - hardware path shells to python3/luma.oled; pixel pushing is
//!       commodity work, same pattern as the DHT subprocess in hal.rs
//!
//! ==============================================================================

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::mood::Mood;
use crate::sensors::Observation;

pub const RENDER_INTERVAL_MS: u64 = 2000;

/// Something that can show a handful of text lines. Real panel behind the
/// `hardware` feature, logger mock otherwise, recorder in tests.
pub trait Surface: Send {
    /// one-shot detection of the panel; Err = not present
    fn probe(&mut self) -> Result<()>;
    /// draw the given lines top to bottom, replacing the whole screen
    fn draw(&mut self, lines: &[String]) -> Result<()>;
}

/// Screen layout for one observation: title, big face, phrase, stats.
pub fn format_screen(obs: &Observation, mood: Mood) -> Vec<String> {
    vec![
        "Smart Plant Buddy".to_string(),
        mood.glyph().to_string(),
        mood.label().to_string(),
        format!("S:{} T:{:.0}C", obs.soil_raw, obs.temp_c),
        format!("H:{:.0}%", obs.hum_pct),
    ]
}

pub struct Display {
    surface: Box<dyn Surface>,
    enabled: bool,
    last_render_ms: Option<u64>,
}

impl Display {
    pub fn new(surface: Box<dyn Surface>) -> Self {
        Self { surface, enabled: false, last_render_ms: None }
    }

    /// Probe the panel once. Returns whether rendering is available; a
    /// missing panel is reported here and never re-probed.
    pub fn init(&mut self) -> bool {
        match self.surface.probe() {
            Ok(()) => {
                self.enabled = true;
                info!("display ready");
            }
            Err(e) => {
                warn!("display not found, continuing without it: {}", e);
            }
        }
        self.enabled
    }

    /// Best-effort full-screen message (startup / connectivity banners);
    /// not subject to the render interval gate.
    pub fn splash(&mut self, lines: &[&str]) {
        if !self.enabled {
            return;
        }
        let owned: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        if let Err(e) = self.surface.draw(&owned) {
            warn!("splash draw failed: {}", e);
        }
    }

    /// Render the observation if the 2000ms window has elapsed. Returns
    /// whether a draw happened (gate closed or display disabled = false).
    pub fn render(&mut self, obs: &Observation, mood: Mood, now_ms: u64) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(last) = self.last_render_ms {
            if now_ms.saturating_sub(last) < RENDER_INTERVAL_MS {
                debug!("render gated ({}ms since last)", now_ms.saturating_sub(last));
                return false;
            }
        }
        self.last_render_ms = Some(now_ms);
        if let Err(e) = self.surface.draw(&format_screen(obs, mood)) {
            warn!("render failed: {}", e);
        }
        true
    }
}

// ==============================================================================================
// MOCK SURFACE (For WSL / Non-Hardware Build)
// ==============================================================================================
#[cfg(not(feature = "hardware"))]
pub struct PanelSurface {}

#[cfg(not(feature = "hardware"))]
impl PanelSurface {
    pub fn new(_addr: &str) -> Self {
        tracing::info!("Using MOCK display surface");
        Self {}
    }
}

#[cfg(not(feature = "hardware"))]
impl Surface for PanelSurface {
    fn probe(&mut self) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, lines: &[String]) -> Result<()> {
        tracing::debug!("[MOCK OLED] {}", lines.join(" | "));
        Ok(())
    }
}

// ==============================================================================================
// REAL SURFACE (SSD1306 over I2C, pixels pushed by python3/luma.oled)
// ==============================================================================================
#[cfg(feature = "hardware")]
pub struct PanelSurface {
    addr: u8,
}

#[cfg(feature = "hardware")]
impl PanelSurface {
    pub fn new(addr: &str) -> Self {
        let addr = crate::config::parse_i2c_addr(addr).unwrap_or(0x3c);
        Self { addr }
    }
}

#[cfg(feature = "hardware")]
impl Surface for PanelSurface {
    fn probe(&mut self) -> Result<()> {
        use rppal::i2c::I2c;
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(self.addr as u16)?;
        // 0xAE = display-off command; a NACK here means no panel
        i2c.write(&[0x00, 0xAE])?;
        Ok(())
    }

    fn draw(&mut self, lines: &[String]) -> Result<()> {
        use std::process::Command;

        // y offsets roughly matching a 128x64 panel: title, rule, face,
        // phrase, stats rows
        let ys = [0, 14, 34, 48, 56];
        let mut text_calls = String::new();
        for (i, line) in lines.iter().enumerate() {
            let y = ys.get(i).copied().unwrap_or(56);
            let escaped = line.replace('\\', "\\\\").replace('"', "\\\"");
            text_calls.push_str(&format!(
                "    draw.text((0, {}), \"{}\", fill=255)\n",
                y, escaped
            ));
        }

        let script = format!(
            r#"
from luma.core.interface.serial import i2c
from luma.oled.device import ssd1306
from luma.core.render import canvas
serial = i2c(port=1, address=0x{:02X})
device = ssd1306(serial)
with canvas(device) as draw:
    draw.line((0, 10, 127, 10), fill=255)
{}
"#,
            self.addr, text_calls
        );

        let output = Command::new("python3").args(["-c", &script]).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("oled draw failed: {}", stderr.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// records every draw so tests can count and inspect them
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSurface {
        pub draws: Arc<Mutex<Vec<Vec<String>>>>,
        pub fail_probe: bool,
    }

    impl Surface for RecordingSurface {
        fn probe(&mut self) -> Result<()> {
            if self.fail_probe {
                anyhow::bail!("no panel at 0x3c");
            }
            Ok(())
        }

        fn draw(&mut self, lines: &[String]) -> Result<()> {
            self.draws.lock().unwrap().push(lines.to_vec());
            Ok(())
        }
    }

    fn obs(soil: u16) -> Observation {
        Observation {
            soil_raw: soil,
            light_raw: 100,
            temp_c: 21.0,
            hum_pct: 50.0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn render_is_gated_to_one_draw_per_window() {
        let rec = RecordingSurface::default();
        let mut d = Display::new(Box::new(rec.clone()));
        assert!(d.init());

        assert!(d.render(&obs(2000), Mood::Happy, 10_000));
        // ticks inside the window are suppressed
        assert!(!d.render(&obs(2001), Mood::Happy, 10_500));
        assert!(!d.render(&obs(2002), Mood::Happy, 11_999));
        // window elapsed
        assert!(d.render(&obs(2003), Mood::Happy, 12_000));
        assert_eq!(rec.draws.lock().unwrap().len(), 2);
    }

    #[test]
    fn failed_probe_disables_rendering_for_good() {
        let rec = RecordingSurface { fail_probe: true, ..Default::default() };
        let mut d = Display::new(Box::new(rec.clone()));
        assert!(!d.init());
        assert!(!d.render(&obs(2000), Mood::Happy, 10_000));
        d.splash(&["READY!"]);
        assert!(rec.draws.lock().unwrap().is_empty());
    }

    #[test]
    fn screen_layout_shows_readings_and_mood() {
        let lines = format_screen(&obs(2345), Mood::Thirsty);
        assert_eq!(lines[1], Mood::Thirsty.glyph());
        assert_eq!(lines[2], "I'm Thirsty");
        assert_eq!(lines[3], "S:2345 T:21C");
        assert_eq!(lines[4], "H:50%");
    }

    #[test]
    fn sentinel_readings_still_format() {
        let o = Observation {
            soil_raw: 2000,
            light_raw: 100,
            temp_c: crate::sensors::TEMP_SENTINEL,
            hum_pct: crate::sensors::HUM_SENTINEL,
            timestamp_ms: 0,
        };
        let lines = format_screen(&o, Mood::Happy);
        assert_eq!(lines[3], "S:2000 T:-100C");
        assert_eq!(lines[4], "H:-1%");
    }
}
