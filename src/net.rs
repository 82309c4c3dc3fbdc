//! ==============================================================================
//! net.rs - Connectivity Check & Repair
//! ==============================================================================
//!
//! purpose:
//!     decides "online vs offline" with a short TCP probe, and when offline
//!     runs one bounded reconnect attempt: fire the configured external
//!     repair command (e.g. nmcli), then poll the probe until the link is
//!     back or the budget (default 15s) runs out.
//!
//! the reconnect is synchronous with respect to the tick: it blocks the
//!     whole tick until it returns, and nothing can interrupt it. that is
//!     the intended model, not an accident.
//!
//! system time is assumed NTP-disciplined by the OS; this module only
//!     reads it.
//!
//! relationships:
//!     - used by: sched.rs (top-of-tick check), main.rs (initial connect)
//!     - uses: std TcpStream for the probe, subprocess for the repair
//!       command, same pattern as the peripheral subprocesses in hal.rs
//!
//! ==============================================================================

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::NetConfig;

const PROBE_TIMEOUT_MS: u64 = 1500;

/// Time source for the bounded-retry loop; real clock in production, fake
/// in tests so no test ever sleeps 15 seconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&mut self, ms: u64);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        crate::hal::epoch_ms()
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Poll `probe` every `interval_ms` until it passes or `timeout_ms` has
/// elapsed. Always probes at least once.
pub fn wait_until<P, C>(mut probe: P, clock: &mut C, timeout_ms: u64, interval_ms: u64) -> bool
where
    P: FnMut() -> bool,
    C: Clock,
{
    let deadline = clock.now_ms().saturating_add(timeout_ms);
    loop {
        if probe() {
            return true;
        }
        if clock.now_ms() >= deadline {
            return false;
        }
        clock.sleep_ms(interval_ms);
    }
}

pub struct NetMonitor {
    probe_addr: String,
    reconnect_cmd: Vec<String>,
    timeout_ms: u64,
    poll_ms: u64,
}

impl NetMonitor {
    pub fn new(cfg: &NetConfig) -> Self {
        Self {
            probe_addr: cfg.probe_addr.clone(),
            reconnect_cmd: cfg.reconnect_cmd.clone(),
            timeout_ms: cfg.reconnect_timeout_ms,
            poll_ms: cfg.reconnect_poll_ms,
        }
    }

    /// short TCP connect to the probe address; any reachable peer counts
    pub fn is_online(&self) -> bool {
        let Ok(mut addrs) = self.probe_addr.to_socket_addrs() else {
            return false;
        };
        let Some(addr) = addrs.next() else {
            return false;
        };
        TcpStream::connect_timeout(&addr, Duration::from_millis(PROBE_TIMEOUT_MS)).is_ok()
    }

    /// One bounded repair attempt. Returns whether the link came back.
    pub fn reconnect(&self) -> bool {
        info!("connectivity lost, attempting reconnect (budget {}ms)", self.timeout_ms);
        self.run_repair_cmd();
        let ok = wait_until(
            || self.is_online(),
            &mut SystemClock,
            self.timeout_ms,
            self.poll_ms,
        );
        if ok {
            info!("connectivity restored");
        } else {
            warn!("reconnect failed, staying offline this tick");
        }
        ok
    }

    /// check, and repair if needed; the per-tick entry point
    pub fn ensure_online(&self) -> bool {
        if self.is_online() {
            return true;
        }
        self.reconnect()
    }

    fn run_repair_cmd(&self) {
        let Some((prog, args)) = self.reconnect_cmd.split_first() else {
            return;
        };
        match std::process::Command::new(prog).args(args).output() {
            Ok(out) if !out.status.success() => {
                warn!(
                    "repair command {:?} exited with {}: {}",
                    prog,
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("repair command {:?} failed to start: {}", prog, e),
        }
    }
}
