//! ==============================================================================
//! sched.rs - Tick Scheduler
//! ==============================================================================
//!
//! purpose:
//!     owns every component and the per-tick shared state, and runs one
//!     full tick in a fixed order:
//!
//!     1. (the viewer transport is serviced by the runtime between ticks)
//!     2. connectivity check, with a synchronous bounded repair if offline
//!     3. sensor read
//!     4. mood classification - computed once, then shared
//!     5. conditional display render (2000ms gate lives in Display)
//!     6. unconditional broadcast
//!     7. conditional durable log (attempt gate lives in DurableLogger)
//!
//!     render and broadcast always see the same Observation/Mood because
//!     both come from step 3/4's single computation. all mutable state is
//!     owned here or inside the gated components; nothing else writes it.
//!
//! relationships:
//!     - used by: main.rs (constructed once, ticked forever)
//!     - uses: every other module
//!
//! ==============================================================================

use tracing::info;

use crate::display::Display;
use crate::durable::DurableLogger;
use crate::hal::{epoch_ms, Hardware};
use crate::live::Broadcaster;
use crate::mood;
use crate::net::NetMonitor;
use crate::sensors;

pub struct Scheduler {
    hw: Box<dyn Hardware>,
    display: Display,
    broadcaster: Broadcaster,
    durable: DurableLogger,
    net: NetMonitor,
}

impl Scheduler {
    pub fn new(
        hw: Box<dyn Hardware>,
        display: Display,
        broadcaster: Broadcaster,
        durable: DurableLogger,
        net: NetMonitor,
    ) -> Self {
        Self { hw, display, broadcaster, durable, net }
    }

    /// One full tick. Never fails: every error inside degrades the tick,
    /// none of them end it.
    pub async fn tick(&mut self) {
        let online = self.net.ensure_online();

        let now_ms = epoch_ms();
        let obs = sensors::read(self.hw.as_ref(), now_ms).await;
        let mood = mood::classify(obs.soil_raw, obs.light_raw, obs.temp_c);

        info!(
            "soil={} light={} temp={:.1}C hum={:.0}% mood={}",
            obs.soil_raw,
            obs.light_raw,
            obs.temp_c,
            obs.hum_pct,
            mood.wire_name()
        );

        self.display.render(&obs, mood, now_ms);
        self.broadcaster.broadcast(&obs, mood).await;
        self.durable.maybe_log(&obs, mood, online, now_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DurableConfig, NetConfig};
    use crate::display::tests::RecordingSurface;
    use crate::sensors::tests::ScriptedHal;

    fn offline_net() -> NetMonitor {
        // 127.0.0.1:9 (discard) refuses instantly; zero budget means the
        // repair gives up after one probe, so ticks stay fast offline
        NetMonitor::new(&NetConfig {
            probe_addr: "127.0.0.1:9".to_string(),
            reconnect_cmd: vec![],
            reconnect_timeout_ms: 0,
            reconnect_poll_ms: 1,
        })
    }

    fn scheduler(soil: u16, surface: RecordingSurface) -> Scheduler {
        let hw = ScriptedHal::new(vec![soil], 900, Ok((21.46, 48.6)));
        let mut display = Display::new(Box::new(surface));
        display.init();
        Scheduler::new(
            Box::new(hw),
            display,
            Broadcaster::new(),
            DurableLogger::new(
                &DurableConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                    plant_id: "plant1".to_string(),
                    interval_ms: 900_000,
                },
                epoch_ms(),
            ),
            offline_net(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_and_render_share_one_computation() {
        let surface = RecordingSurface::default();
        let mut sched = scheduler(2100, surface.clone());
        let mut rx = sched.broadcaster.subscribe();

        sched.tick().await;

        // exactly one broadcast per tick
        let v: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(v["soil"], 2100);
        assert_eq!(v["mood"], "happy");

        // the render in the same tick shows the same reading and mood
        let draws = surface.draws.lock().unwrap();
        assert_eq!(draws.len(), 1);
        assert!(draws[0][3].starts_with("S:2100"));
        assert_eq!(draws[0][2], "I'm Happy!");
    }

    #[tokio::test(start_paused = true)]
    async fn every_tick_broadcasts_even_when_render_is_gated() {
        let surface = RecordingSurface::default();
        let mut sched = scheduler(2100, surface.clone());
        let mut rx = sched.broadcaster.subscribe();

        // two back-to-back ticks land inside one render window
        sched.tick().await;
        sched.tick().await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert_eq!(surface.draws.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dht_fault_degrades_the_tick_instead_of_ending_it() {
        let hw = ScriptedHal::new(vec![1000], 900, Err("no pulse".into()));
        let mut display = Display::new(Box::new(RecordingSurface::default()));
        display.init();
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe();
        let mut sched = Scheduler::new(
            Box::new(hw),
            display,
            broadcaster,
            DurableLogger::new(
                &DurableConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                    plant_id: "plant1".to_string(),
                    interval_ms: 900_000,
                },
                epoch_ms(),
            ),
            offline_net(),
        );

        sched.tick().await;

        let v: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(v["temp"], -100.0);
        assert_eq!(v["hum"], -1.0);
        // dry soil still classifies; the sentinel never reads as hot
        assert_eq!(v["mood"], "thirsty");
    }
}
