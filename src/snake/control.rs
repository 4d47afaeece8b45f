use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Events per second over a sliding window of recent timestamps
struct RateMeter {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl RateMeter {
    const WINDOW: Duration = Duration::from_secs(2);

    fn new() -> Self {
        Self {
            window: Self::WINDOW,
            stamps: VecDeque::new(),
        }
    }

    fn record(&mut self, at: Instant) {
        while let Some(&first) = self.stamps.front() {
            if at.saturating_duration_since(first) <= self.window {
                break;
            }
            self.stamps.pop_front();
        }
        self.stamps.push_back(at);
    }

    fn clear(&mut self) {
        self.stamps.clear();
    }

    fn rate(&self) -> f64 {
        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() >= 2 && last > first => {
                (self.stamps.len() - 1) as f64 / (*last - *first).as_secs_f64()
            }
            _ => 0.,
        }
    }
}

/// Fixed-timestep driver for the snake simulation, frame deltas go
/// in and come out as whole ticks
pub struct GameControl {
    // time which has not yet been turned into ticks
    accumulated: Duration,

    measured_tps: RateMeter,
    measured_fps: RateMeter,
}

impl GameControl {
    /// After a long stall (window dragged, machine asleep) at most
    /// this many ticks are replayed
    const MAX_CATCH_UP: u32 = 5;

    pub fn new() -> Self {
        Self {
            accumulated: Duration::ZERO,
            measured_tps: RateMeter::new(),
            measured_fps: RateMeter::new(),
        }
    }

    // call once per frame in update()
    pub fn feed(&mut self, delta: Duration) {
        self.accumulated += delta;
    }

    /// Repeatedly called in update() as while loop condition, the
    /// interval is asked for every tick since it changes with the score
    pub fn can_update(&mut self, interval: Duration) -> bool {
        if interval.is_zero() {
            return false;
        }

        let limit = interval * Self::MAX_CATCH_UP;
        if self.accumulated > limit {
            self.accumulated = limit;
        }

        if self.accumulated >= interval {
            self.accumulated -= interval;
            self.measured_tps.record(Instant::now());
            true
        } else {
            false
        }
    }

    /// Forget accumulated time, used whenever the simulation stops
    /// or starts so resuming doesn't cause a burst of ticks
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.measured_tps.clear();
    }

    // call in draw()
    pub fn graphics_frame(&mut self) {
        self.measured_fps.record(Instant::now());
    }

    /// Ticks per second actually run
    pub fn measured_tps(&self) -> f64 {
        self.measured_tps.rate()
    }

    pub fn measured_fps(&self) -> f64 {
        self.measured_fps.rate()
    }
}

#[test]
fn test_accumulator() {
    let interval = Duration::from_millis(100);
    let mut control = GameControl::new();

    let mut ticks = 0;
    // 16ms frames for 1 second
    for _ in 0..62 {
        control.feed(Duration::from_millis(16));
        while control.can_update(interval) {
            ticks += 1;
        }
    }
    assert_eq!(ticks, 9, "992ms at 100ms per tick");

    control.feed(Duration::from_millis(8));
    assert!(control.can_update(interval));
    assert!(!control.can_update(interval));
}

#[test]
fn test_catch_up_limit() {
    let interval = Duration::from_millis(100);
    let mut control = GameControl::new();
    control.feed(Duration::from_secs(60));

    let mut ticks = 0;
    while control.can_update(interval) {
        ticks += 1;
    }
    assert_eq!(ticks, GameControl::MAX_CATCH_UP);

    control.feed(Duration::from_millis(250));
    control.reset();
    assert!(!control.can_update(interval));
}

#[test]
fn test_rate_meter_window() {
    let start = Instant::now();
    let mut meter = RateMeter::new();
    assert_eq!(meter.rate(), 0.);

    // 10 per second for 5 seconds, only the last 2 seconds count
    for i in 0..=50 {
        meter.record(start + Duration::from_millis(100 * i));
    }
    assert_eq!(meter.stamps.len(), 21);
    assert!((meter.rate() - 10.).abs() < 1e-9, "{}", meter.rate());

    meter.clear();
    meter.record(start);
    assert_eq!(meter.rate(), 0.);
}
