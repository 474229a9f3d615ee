//! The services the embedder provides beyond guest memory.

use crate::error::I32Exit;
use crate::wasi::Clockid;
use cap_rand::RngCore;
use cap_std::ambient_authority;
use cap_std::time::{Instant, MonotonicClock, SystemClock};
use cap_time_ext::{MonotonicClockExt, SystemClockExt};
use std::io::Write;

pub const CLOCK_REALTIME: Clockid = 0;
pub const CLOCK_MONOTONIC: Clockid = 1;
pub const CLOCK_PROCESS_CPUTIME_ID: Clockid = 2;
pub const CLOCK_THREAD_CPUTIME_ID: Clockid = 3;

/// Callbacks from the hostcalls into the embedder.
///
/// None of these receive the `WasiCtx`, so a callback can never re-enter
/// a hostcall.
pub trait Host {
    /// Emits one complete line written to fd 1, without its `\n`.
    fn stdout_line(&mut self, line: &[u8]);

    /// Emits one complete line written to fd 2, without its `\n`.
    fn stderr_line(&mut self, line: &[u8]);

    fn random_u64(&mut self) -> u64;

    /// Current time of clock `id` in milliseconds.
    fn clock_ms(&mut self, id: Clockid) -> f64;

    /// Resolution of clock `id` in nanoseconds; 0 if the clock is not
    /// supported.
    fn clock_res_ns(&mut self, id: Clockid) -> u64;

    /// Ends the guest. Never returns.
    fn proc_exit(&mut self, status: I32Exit) -> !;
}

/// A `Host` backed by the current process.
pub struct StdHost {
    system: SystemClock,
    monotonic: MonotonicClock,
    creation_time: Instant,
}

impl StdHost {
    pub fn new() -> Self {
        let monotonic = MonotonicClock::new(ambient_authority());
        let creation_time = monotonic.now();
        Self {
            system: SystemClock::new(ambient_authority()),
            monotonic,
            creation_time,
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StdHost {
    fn stdout_line(&mut self, line: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(line).and_then(|()| out.write_all(b"\n"));
    }

    fn stderr_line(&mut self, line: &[u8]) {
        let mut out = std::io::stderr().lock();
        let _ = out.write_all(line).and_then(|()| out.write_all(b"\n"));
    }

    fn random_u64(&mut self) -> u64 {
        cap_rand::thread_rng(ambient_authority()).next_u64()
    }

    fn clock_ms(&mut self, id: Clockid) -> f64 {
        let elapsed = match id {
            CLOCK_REALTIME => self
                .system
                .now()
                .into_std()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default(),
            CLOCK_MONOTONIC => self.monotonic.now().duration_since(self.creation_time),
            _ => return 0.0,
        };
        elapsed.as_secs_f64() * 1000.0
    }

    fn clock_res_ns(&mut self, id: Clockid) -> u64 {
        let resolution = match id {
            CLOCK_REALTIME => self.system.resolution(),
            CLOCK_MONOTONIC => self.monotonic.resolution(),
            _ => return 0,
        };
        u64::try_from(resolution.as_nanos()).unwrap_or(u64::MAX)
    }

    fn proc_exit(&mut self, status: I32Exit) -> ! {
        std::process::exit(status.0 as i32)
    }
}
