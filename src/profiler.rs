// profiler.rs
// Scoped wall-clock timing of simulation phases, compiled in with the `profiling` feature

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cumulative time and hit count per named section.
#[derive(Default)]
pub struct Profiler {
    pub timings: HashMap<&'static str, (Duration, u64)>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        let elapsed = guard.start.elapsed();
        let entry = self.timings.entry(guard.name).or_default();
        entry.0 += elapsed;
        entry.1 += 1;
    }

    /// Sections ordered by total time, longest first.
    pub fn report_sorted(&self) -> Vec<(&'static str, Duration, u64)> {
        let mut v: Vec<_> = self.timings.iter().map(|(n, (d, c))| (*n, *d, *c)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }

    pub fn clear(&mut self) {
        self.timings.clear();
    }

    pub fn log_and_clear(&mut self) {
        for (name, total, calls) in self.report_sorted() {
            let mean = total / calls.max(1) as u32;
            log::info!("{:<20} {:>12.3?} total {:>10.3?} mean over {} calls", name, total, mean, calls);
        }
        self.clear();
    }
}

pub struct ProfilerGuard {
    name: &'static str,
    start: Instant,
}

/// Start a profiling section. Returns a guard that will update the global
/// profiler when dropped.
pub fn start(name: &'static str) -> ProfilerGuard {
    ProfilerGuard { name, start: Instant::now() }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Macro helper to profile a scope only when the `profiling` feature is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($name);
    };
}
