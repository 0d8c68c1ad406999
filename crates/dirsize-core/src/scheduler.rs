//! Fixed-interval driver for scan cycles.
//!
//! ```text
//! Idle ──run()──► Running ──shutdown()──► ShuttingDown ──► Stopped
//! ```
//!
//! Cycles run one at a time on the calling thread. When a cycle overruns the
//! interval, exactly one tick is pending and fires right after it; further
//! missed ticks are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span};

use crate::fmt::format_interval;

/// Longest sleep between checks of the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            2 => SchedulerState::ShuttingDown,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Cloneable view of a scheduler, usable from other threads.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Requests shutdown. A cycle in progress runs to completion.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.state.compare_exchange(
            SchedulerState::Running as u8,
            SchedulerState::ShuttingDown as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

pub struct Scheduler {
    interval: Duration,
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: SchedulerHandle {
                running: Arc::new(AtomicBool::new(true)),
                state: Arc::new(AtomicU8::new(SchedulerState::Idle as u8)),
            },
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    fn set_state(&self, state: SchedulerState) {
        self.handle.state.store(state as u8, Ordering::SeqCst);
    }

    /// Calls `tick` once per interval until shutdown is requested.
    ///
    /// The first tick fires one interval after the call. A cycle in progress
    /// when shutdown is requested runs to completion. Returns the number of
    /// completed cycles.
    pub fn run<T: FnMut(u64)>(&self, mut tick: T) -> u64 {
        if self.handle.running.load(Ordering::SeqCst) {
            self.set_state(SchedulerState::Running);
        } else {
            self.set_state(SchedulerState::ShuttingDown);
        }
        info!(
            "Starting collection loop, interval {}",
            format_interval(self.interval)
        );

        let mut cycles: u64 = 0;
        let mut next_tick = Instant::now() + self.interval;

        while self.wait_until(next_tick) {
            cycles += 1;
            let span = info_span!("cycle", n = cycles);
            {
                let _enter = span.enter();
                tick(cycles);
            }

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick < now {
                debug!(
                    "Cycle {} overran the {} interval, next cycle starts now",
                    cycles,
                    format_interval(self.interval)
                );
                next_tick = now;
            }
        }

        info!("Collection loop stopping after {} cycles", cycles);
        self.set_state(SchedulerState::Stopped);
        cycles
    }

    /// Sleeps until `deadline` in short slices. Returns `false` on shutdown.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if !self.handle.running.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SHUTDOWN_POLL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::scanner::TreeScanner;
    use crate::cycle::ScanCycle;
    use crate::model::{DirectoryMapping, ScanTarget};
    use crate::sink::MemorySink;

    #[test]
    fn test_initial_state_is_idle() {
        let scheduler = Scheduler::new(Duration::from_secs(10));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_stops_when_shutdown_inside_cycle() {
        let scheduler = Scheduler::new(Duration::from_millis(5));
        let handle = scheduler.handle();

        let cycles = scheduler.run(|n| {
            assert_eq!(handle.state(), SchedulerState::Running);
            if n == 3 {
                handle.shutdown();
                // The in-flight cycle still finishes.
                assert_eq!(handle.state(), SchedulerState::ShuttingDown);
            }
        });

        assert_eq!(cycles, 3);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_no_cycle_when_stopped_before_first_tick() {
        let scheduler = Scheduler::new(Duration::from_millis(5));
        let handle = scheduler.handle();
        handle.shutdown();
        assert_eq!(handle.state(), SchedulerState::Idle);

        let cycles = scheduler.run(|_| panic!("must not tick"));
        assert_eq!(cycles, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_ticks_are_paced_by_interval() {
        let scheduler = Scheduler::new(Duration::from_millis(30));
        let handle = scheduler.handle();
        let started = Instant::now();

        scheduler.run(|n| {
            if n == 3 {
                handle.shutdown();
            }
        });

        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn test_state_observed_from_another_thread() {
        let scheduler = Scheduler::new(Duration::from_secs(3600));
        let handle = scheduler.handle();
        let worker = std::thread::spawn(move || scheduler.run(|_| {}));

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.state() != SchedulerState::Running {
            assert!(Instant::now() < deadline, "loop never started");
            std::thread::sleep(Duration::from_millis(5));
        }

        handle.shutdown();
        let cycles = worker.join().unwrap();
        assert_eq!(cycles, 0);
        assert_eq!(handle.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_slow_cycles_never_overlap() {
        // Each scan lists 3 directories at 15ms per listing, the interval is 5ms.
        let fs = MockFs::two_roots().with_latency(Duration::from_millis(15));
        let sink = MemorySink::new();
        let mut cycle = ScanCycle::new(TreeScanner::new(fs), sink.clone(), "m");
        let targets = vec![ScanTarget::plain(DirectoryMapping::from_path("/data/a"))];

        let mut spans: Vec<(Instant, Instant)> = Vec::new();
        let scheduler = Scheduler::new(Duration::from_millis(5));
        let handle = scheduler.handle();

        scheduler.run(|n| {
            let start = Instant::now();
            let report = cycle.run_once(&targets);
            assert_eq!(report.sent, 1);
            spans.push((start, Instant::now()));
            if n == 4 {
                handle.shutdown();
            }
        });

        assert_eq!(spans.len(), 4);
        for pair in spans.windows(2) {
            let (_, prev_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!(next_start >= prev_end);
        }
        assert_eq!(sink.calls(), 4);
    }
}
