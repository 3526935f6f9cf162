use crate::{
    dimmer,
    mutex::{CriticalSection, IrqCtx, Mutex},
    ports::PORTA,
    timer::{TIMER_TICK_US, Timestamp, timer_arm_compb, timer_get},
    triac,
};
use core::cell::Cell;
use dimcore::sync::{Edge, ZeroCrossMonitor};

/// Mains frequency. The engine is fixed to one frequency.
pub const MAINS_FREQ: u32 = 50;

/// Mains half-wave duration in timer ticks.
pub const TICKS_PER_HALFCYCLE: u16 = (1_000_000 / (MAINS_FREQ * 2) / TIMER_TICK_US as u32) as u16;

/// Full mains period in timer ticks.
const TICKS_PER_PERIOD: u8 = (TICKS_PER_HALFCYCLE * 2) as u8;

static MONITOR: Mutex<Cell<ZeroCrossMonitor>> =
    Mutex::new(Cell::new(ZeroCrossMonitor::new(TICKS_PER_HALFCYCLE)));
static PREV_EDGE: Mutex<Cell<Timestamp>> = Mutex::new(Cell::new(Timestamp::new()));
static PREV_LEVEL: Mutex<Cell<bool>> = Mutex::new(Cell::new(true));

/// Pin change on the zero-cross sense pin.
///
/// The detector pulls the pin low around the crossing, so the falling
/// edge is the phase reference. The phase clock is the free running
/// timer; the distance to the previous accepted edge is what the
/// monitor judges.
pub fn irq_handler_pcint(c: &IrqCtx) {
    let cs = c.cs();

    let Some(pin) = dimmer::zero_cross_pin(cs) else {
        return;
    };

    let level = PORTA.get(pin as usize);
    let falling = PREV_LEVEL.borrow(cs).get() && !level;
    PREV_LEVEL.borrow(cs).set(level);
    if !falling {
        return;
    }

    let now = timer_get(&c.to_any());
    let elapsed = now.0.wrapping_sub(PREV_EDGE.borrow(cs).get().0) as u16;

    let mut monitor = MONITOR.borrow(cs).get();
    let edge = monitor.edge(elapsed);
    MONITOR.borrow(cs).set(monitor);

    if edge == Edge::Accepted {
        PREV_EDGE.borrow(cs).set(now);
        // Rearm the period watchdog one full period after this
        // crossing. It only ever fires if the next crossing goes
        // missing.
        timer_arm_compb(&c.to_any(), Timestamp(now.0.wrapping_add(TICKS_PER_PERIOD)));
        triac::crossing(c, now);
    }
}

/// Compare B: a full mains period has passed without an accepted
/// crossing, e.g. a brief brownout. The next edge resynchronizes
/// unconditionally. No error is raised; firing simply pauses until
/// the next clean edge.
pub fn irq_handler_timer1_compb(c: &IrqCtx) {
    let cs = c.cs();

    let mut monitor = MONITOR.borrow(cs).get();
    monitor.timeout();
    MONITOR.borrow(cs).set(monitor);
}

/// Whether the phase reference currently tracks the mains.
#[allow(dead_code)]
pub fn synchronized(cs: CriticalSection<'_>) -> bool {
    MONITOR.borrow(cs).get().is_synchronized()
}

// vim: ts=4 sw=4 expandtab
