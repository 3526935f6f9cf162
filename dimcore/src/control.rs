use crate::{DelayTicks, curve::BrightnessCurve};

/// Cadence of [DimControl::tick] in milliseconds.
pub const TICK_INTERVAL_MS: u32 = 10;

/// Single slot state change notification.
///
/// Raised when the on flag or the target brightness changes, never on
/// ramp steps. Registering a new handler replaces the old one.
pub type StateChangedHandler = fn(on: bool, brightness: u8);

/// Brightness state machine.
///
/// Owns on/off, the target brightness, the ramped current brightness,
/// the configured brightness bounds and the temporary minimum
/// brightness hold. The periodic tick moves the current brightness at
/// most one unit towards the target and yields the firing delay to
/// feed to the sequencer.
pub struct DimControl {
    on: bool,
    brightness: u8,
    current: u8,
    min: u8,
    max: u8,
    hold_level: u8,
    hold_until: u32,
    hold_active: bool,
    ticks_per_halfcycle: u16,
    curve: BrightnessCurve,
    handler: Option<StateChangedHandler>,
}

impl DimControl {
    /// `ticks_per_halfcycle` is the half-cycle duration in the tick
    /// unit of the delay consumer.
    pub const fn new(ticks_per_halfcycle: u16) -> Self {
        Self {
            on: false,
            brightness: 100,
            current: 0,
            min: 1,
            max: 100,
            hold_level: 1,
            hold_until: 0,
            hold_active: false,
            ticks_per_halfcycle,
            curve: BrightnessCurve::new(),
            handler: None,
        }
    }

    pub const fn is_on(&self) -> bool {
        self.on
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn current_brightness(&self) -> u8 {
        self.current
    }

    pub fn on_state_changed(&mut self, handler: StateChangedHandler) {
        self.handler = Some(handler);
    }

    fn raise_state_changed(&self) {
        if let Some(handler) = self.handler {
            handler(self.on, self.brightness);
        }
    }

    pub fn set_on(&mut self, on: bool) {
        if self.on != on {
            self.on = on;
            self.raise_state_changed();
        }
    }

    pub fn toggle(&mut self) {
        self.set_on(!self.on);
    }

    pub fn set_brightness(&mut self, level: u8) {
        let level = level.clamp(self.min, self.max);
        if self.brightness != level {
            self.brightness = level;
            self.raise_state_changed();
        }
    }

    /// Step the target relative to the *ramped* current brightness, so
    /// that repeated steps during a running fade feel continuous.
    pub fn change_brightness(&mut self, delta: i8) {
        let level = (self.current as i16 + delta as i16).max(0);
        self.set_brightness(level.min(u8::MAX as i16) as u8);
    }

    /// Install a temporary brightness floor for `timeout_secs` seconds
    /// without committing a new persistent target. A zero timeout
    /// clears the hold immediately.
    pub fn set_min_brightness_for(&mut self, level: u8, timeout_secs: u16, now_ms: u32) {
        if timeout_secs == 0 {
            self.hold_active = false;
        } else {
            self.hold_level = level.clamp(1, 100);
            self.hold_until = now_ms.wrapping_add(timeout_secs as u32 * 1000);
            self.hold_active = true;
        }
    }

    /// Update the configured brightness bounds. An inverted pair is
    /// rejected and the old bounds are kept. The target is re-clamped
    /// into the new bounds.
    pub fn set_min_max(&mut self, min: u8, max: u8) {
        let min = min.clamp(1, 100);
        let max = max.clamp(1, 100);
        if min > max {
            return;
        }
        self.min = min;
        self.max = max;

        let clamped = self.brightness.clamp(min, max);
        if self.brightness != clamped {
            self.brightness = clamped;
            self.raise_state_changed();
        }
    }

    /// Replace the brightness curve. See [BrightnessCurve::replace].
    pub fn set_curve(&mut self, table: &[u16]) -> bool {
        self.curve.replace(table)
    }

    /// Periodic tick. Must be called every [TICK_INTERVAL_MS].
    ///
    /// Expires the hold, ramps the current brightness one unit towards
    /// the target and returns the firing delay to publish. The OFF
    /// value is returned only when fully off: not mid ramp and not
    /// while a hold is active.
    pub fn tick(&mut self, now_ms: u32) -> DelayTicks {
        if self.hold_active && (now_ms.wrapping_sub(self.hold_until) as i32) >= 0 {
            self.hold_active = false;
        }

        let floor = if self.hold_active {
            self.hold_level.max(self.min)
        } else {
            self.min
        };
        let target = if self.on {
            floor.max(self.brightness)
        } else {
            floor
        };

        if self.current < target {
            self.current += 1;
        } else if self.current > target {
            self.current -= 1;
        }

        if !self.on && !self.hold_active && self.current == target {
            DelayTicks::OFF
        } else {
            self.curve.delay(self.current, self.ticks_per_halfcycle)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

    /// Identity curve scaled by 100: curve[i] = i * 100.
    fn identity_curve() -> [u16; 100] {
        core::array::from_fn(|i| (i as u16) * 100)
    }

    /// Control with the identity curve on a 10000 tick half-cycle, so
    /// the delay for brightness b is (b - 1) * 100.
    fn control() -> DimControl {
        let mut c = DimControl::new(10_000);
        assert!(c.set_curve(&identity_curve()));
        c
    }

    /// Tick until the ramp settles, return the last delay.
    fn settle(c: &mut DimControl, now_ms: &mut u32) -> DelayTicks {
        let mut last = c.tick(*now_ms);
        for _ in 0..200 {
            *now_ms += TICK_INTERVAL_MS;
            last = c.tick(*now_ms);
        }
        last
    }

    #[test]
    fn test_steady_state_mapping() {
        let mut c = control();
        let mut now = 0;
        c.set_on(true);

        for b in [1, 2, 50, 99, 100] {
            c.set_brightness(b);
            let delay = settle(&mut c, &mut now);
            assert_eq!(c.brightness(), b);
            assert_eq!(c.current_brightness(), b);
            assert_eq!(delay, DelayTicks((b as u16 - 1) * 100));
        }
    }

    #[test]
    fn test_worked_example() {
        let mut c = control();
        let mut now = 0;
        c.set_on(true);
        c.set_brightness(50);
        assert_eq!(settle(&mut c, &mut now), DelayTicks(4900));

        // Turning off ramps down; OFF appears exactly at the tick
        // where the current brightness reaches the minimum.
        c.set_on(false);
        let mut current = c.current_brightness();
        loop {
            now += TICK_INTERVAL_MS;
            let delay = c.tick(now);
            if c.current_brightness() == 1 {
                assert_eq!(delay, DelayTicks::OFF);
                break;
            }
            assert_eq!(c.current_brightness(), current - 1);
            assert_ne!(delay, DelayTicks::OFF);
            current = c.current_brightness();
        }
    }

    #[test]
    fn test_monotonic_ramp() {
        let mut c = control();
        let mut now = 0;
        c.set_on(true);
        c.set_brightness(40);

        let mut prev = c.current_brightness();
        loop {
            now += TICK_INTERVAL_MS;
            c.tick(now);
            let cur = c.current_brightness();
            if cur == 40 {
                break;
            }
            assert_eq!(cur, prev + 1);
            prev = cur;
        }
        // No overshoot once settled.
        for _ in 0..10 {
            now += TICK_INTERVAL_MS;
            c.tick(now);
            assert_eq!(c.current_brightness(), 40);
        }
    }

    #[test]
    fn test_change_brightness_uses_current() {
        let mut c = control();
        let mut now = 0;
        c.set_on(true);
        c.set_brightness(50);
        settle(&mut c, &mut now);

        // Mid ramp towards 100, a relative step is based on the
        // ramped value, not the target.
        c.set_brightness(100);
        for _ in 0..5 {
            now += TICK_INTERVAL_MS;
            c.tick(now);
        }
        assert_eq!(c.current_brightness(), 55);
        c.change_brightness(-10);
        assert_eq!(c.brightness(), 45);

        // The floor at zero applies before the bounds clamp.
        c.set_min_max(20, 100);
        c.change_brightness(-128);
        assert_eq!(c.brightness(), 20);
    }

    static SET_ON_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_set_on_notifies_once() {
        fn handler(_on: bool, _brightness: u8) {
            SET_ON_CALLS.fetch_add(1, Ordering::Relaxed);
        }

        let mut c = control();
        c.on_state_changed(handler);

        c.set_on(true);
        c.set_on(true);
        assert_eq!(SET_ON_CALLS.load(Ordering::Relaxed), 1);

        c.toggle();
        assert_eq!(SET_ON_CALLS.load(Ordering::Relaxed), 2);
    }

    static RAMP_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_ramp_does_not_notify() {
        fn handler(_on: bool, _brightness: u8) {
            RAMP_CALLS.fetch_add(1, Ordering::Relaxed);
        }

        let mut c = control();
        let mut now = 0;
        c.on_state_changed(handler);
        c.set_on(true);
        c.set_brightness(30);
        assert_eq!(RAMP_CALLS.load(Ordering::Relaxed), 2);

        settle(&mut c, &mut now);
        assert_eq!(RAMP_CALLS.load(Ordering::Relaxed), 2);

        c.set_brightness(30);
        assert_eq!(RAMP_CALLS.load(Ordering::Relaxed), 2);
    }

    static RECLAMP_ON: AtomicU8 = AtomicU8::new(0);
    static RECLAMP_BRIGHTNESS: AtomicU8 = AtomicU8::new(0);

    #[test]
    fn test_set_min_max_reclamps() {
        fn handler(on: bool, brightness: u8) {
            RECLAMP_ON.store(on as u8, Ordering::Relaxed);
            RECLAMP_BRIGHTNESS.store(brightness, Ordering::Relaxed);
        }

        let mut c = control();
        c.on_state_changed(handler);
        c.set_on(true);
        c.set_brightness(90);

        c.set_min_max(10, 60);
        assert_eq!(c.brightness(), 60);
        assert_eq!(RECLAMP_BRIGHTNESS.load(Ordering::Relaxed), 60);
        assert_eq!(RECLAMP_ON.load(Ordering::Relaxed), 1);

        // Inverted bounds are rejected.
        c.set_min_max(80, 20);
        c.set_brightness(60);
        assert_eq!(c.brightness(), 60);

        // Setters clamp into the configured bounds.
        c.set_brightness(100);
        assert_eq!(c.brightness(), 60);
        c.set_brightness(1);
        assert_eq!(c.brightness(), 10);
    }

    #[test]
    fn test_min_brightness_hold() {
        let mut c = control();
        let mut now = 1000;
        assert_eq!(settle(&mut c, &mut now), DelayTicks::OFF);
        assert!(!c.is_on());

        // Press and hold: floor at 30 for 2 seconds, starting now.
        c.set_min_brightness_for(30, 2, now);
        let t0 = now;

        // The floor ramps in and holds without committing a target.
        loop {
            now += TICK_INTERVAL_MS;
            let delay = c.tick(now);
            assert_ne!(delay, DelayTicks::OFF);
            if c.current_brightness() == 30 {
                break;
            }
        }
        assert!(!c.is_on());
        assert_eq!(c.brightness(), 100);

        // Stays at the floor until the deadline.
        while now + TICK_INTERVAL_MS < t0 + 2000 {
            now += TICK_INTERVAL_MS;
            c.tick(now);
            assert_eq!(c.current_brightness(), 30);
        }

        // After expiry the floor reverts and the brightness ramps
        // back down instead of jumping.
        now = t0 + 2000;
        c.tick(now);
        let mut prev = c.current_brightness();
        while c.current_brightness() > 1 {
            now += TICK_INTERVAL_MS;
            c.tick(now);
            assert!(prev - c.current_brightness() <= 1);
            prev = c.current_brightness();
        }
        assert_eq!(c.tick(now + TICK_INTERVAL_MS), DelayTicks::OFF);
    }

    #[test]
    fn test_hold_cleared_by_zero_timeout() {
        let mut c = control();
        let mut now = 0;
        settle(&mut c, &mut now);

        c.set_min_brightness_for(30, 60, now);
        now += TICK_INTERVAL_MS;
        assert_ne!(c.tick(now), DelayTicks::OFF);

        c.set_min_brightness_for(30, 0, now);
        settle(&mut c, &mut now);
        assert_eq!(c.tick(now), DelayTicks::OFF);
    }

    #[test]
    fn test_hold_deadline_wraparound() {
        let mut c = control();
        let mut now = u32::MAX - 500;

        // Deadline wraps around the millisecond counter.
        c.set_min_brightness_for(20, 1, now);
        for _ in 0..40 {
            now = now.wrapping_add(TICK_INTERVAL_MS);
            c.tick(now);
        }
        // 400 ms in: still held.
        assert_ne!(c.tick(now), DelayTicks::OFF);

        for _ in 0..80 {
            now = now.wrapping_add(TICK_INTERVAL_MS);
            c.tick(now);
        }
        // Past the wrapped deadline: released and ramped out.
        settle(&mut c, &mut now);
        assert_eq!(c.tick(now), DelayTicks::OFF);
    }

    #[test]
    fn test_off_keeps_brightness_target() {
        let mut c = control();
        let mut now = 0;
        c.set_on(true);
        c.set_brightness(70);
        settle(&mut c, &mut now);

        c.set_on(false);
        settle(&mut c, &mut now);
        assert_eq!(c.brightness(), 70);

        // Turning back on ramps from the minimum up to the kept
        // target.
        c.set_on(true);
        let delay = settle(&mut c, &mut now);
        assert_eq!(c.current_brightness(), 70);
        assert_eq!(delay, DelayTicks(6900));
    }
}

// vim: ts=4 sw=4 expandtab
