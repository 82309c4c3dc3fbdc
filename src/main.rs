//! ==============================================================================
//! main.rs - plant buddy entry point
//! ==============================================================================
//!
//! purpose:
//!     single-process houseplant monitor. every tick it reads the sensors,
//!     infers the plant's mood, refreshes the OLED (rate-limited), pushes
//!     the state to live WebSocket viewers, and periodically appends an
//!     entry to the remote log store.
//!
//! responsibilities:
//!     - load configuration and set up logging
//!     - construct the HAL, display, broadcaster, durable logger, net monitor
//!     - serve the viewer endpoint (/ws + /api)
//!     - drive the tick loop forever; no failure is fatal
//!
//! architecture:
//!
//!     ┌────────────────────────────────────────────────────────────┐
//!     │              single-threaded runtime (this file)           │
//!     │  ┌─────────────┐             ┌──────────────────────────┐  │
//!     │  │ tick loop   │             │ viewer server            │  │
//!     │  │ (1s cycle)  │             │ (/ws + /api, port 3000)  │  │
//!     │  └──────┬──────┘             └────────────┬─────────────┘  │
//!     │         │                                 │                │
//!     │         └──────── broadcast channel ──────┘                │
//!     │                                                            │
//!     │   sensors -> mood ─┬─> display (2s gate)                   │
//!     │                    ├─> broadcast (every tick)              │
//!     │                    └─> durable log (15min gate)            │
//!     └────────────────────────────────────────────────────────────┘
//!
//! concurrency model:
//!     current-thread tokio: one cooperative control flow. a tick runs to
//!     completion before the next; the viewer server is serviced at await
//!     points in between. there is no locking discipline to get wrong
//!     because there is no concurrent mutation.
//!
//! ==============================================================================

mod config;
mod display;
mod durable;
mod hal;
mod live;
mod mood;
mod net;
mod sched;
mod sensors;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Plant Buddy - houseplant monitor");
    println!("===========================================================");

    // step 1: load configuration
    let cfg = config::PlantConfig::load_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cfg.print_summary();

    // step 2: hardware
    let hw = hal::Hal::new(&cfg.sensors)?;

    // step 3: display - missing panel is a warning, never fatal
    let surface = display::PanelSurface::new(&cfg.display.i2c_address);
    let mut disp = display::Display::new(Box::new(surface));
    if cfg.display.enabled {
        disp.init();
    } else {
        info!("display disabled by config");
    }
    disp.splash(&["Plant Buddy", "Starting..."]);

    // step 4: viewer endpoint in the background (same thread, cooperative)
    let broadcaster = live::Broadcaster::new();
    let app = live::router(broadcaster.clone());
    let bind = cfg.live.bind.clone();
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&bind).await {
            Ok(listener) => {
                info!("viewer endpoint live at http://{}", bind);
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("viewer server error: {}", e);
                }
            }
            Err(e) => warn!("viewer endpoint unavailable ({}): {}", bind, e),
        }
    });

    // step 5: initial connectivity (bounded; the loop re-checks every tick)
    disp.splash(&["Connecting..."]);
    let net = net::NetMonitor::new(&cfg.net);
    if !net.ensure_online() {
        warn!("starting offline; will keep retrying each tick");
    }
    disp.splash(&["READY!"]);

    // step 6: tick loop, forever
    let durable = durable::DurableLogger::new(&cfg.durable, hal::epoch_ms());
    let mut sched = sched::Scheduler::new(Box::new(hw), disp, broadcaster, durable, net);
    let tick_gap = std::time::Duration::from_millis(cfg.polling.tick_interval_ms);
    info!("tick loop started ({}ms interval)", cfg.polling.tick_interval_ms);

    loop {
        sched.tick().await;
        tokio::time::sleep(tick_gap).await;
    }
}
