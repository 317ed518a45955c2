//! Performance timer, kept as the no-op stub `perftimer.c` degrades to when
//! built without `USE_PERF_TIMER`. spec.md marks this component optional and
//! allows a no-op; this crate has no platform performance-counter dependency
//! to wire up, so it never leaves that branch.

/// A named timer slot. Every method is a no-op; the type exists so call
/// sites read the same way they would if timing were wired up later.
#[derive(Debug, Default)]
pub struct PerfTimer;

impl PerfTimer {
    pub fn new() -> Self {
        Self
    }

    pub fn set_name(&mut self, _timer_ix: usize, _name: &str) {}

    pub fn start(&mut self, _timer_ix: usize) {}

    pub fn stop(&mut self, _timer_ix: usize) {}

    /// Report timings to the log. No-op here since no timer ever accumulates.
    pub fn report(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_lifecycle_is_a_harmless_no_op() {
        let mut timer = PerfTimer::new();
        timer.set_name(0, "search");
        timer.start(0);
        timer.stop(0);
        timer.report();
    }
}
