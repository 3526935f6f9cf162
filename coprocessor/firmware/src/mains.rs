use crate::{
    hw::{self, CriticalSection, Mutex},
    triac,
};
use core::cell::Cell;
use dimcore::sync::{Edge, ZeroCrossMonitor};

/// CPU clock: internal RC oscillator.
pub const FCPU: u32 = 8_000_000;
/// Timer 1 prescaler. One timer tick is 1 us.
pub const TC1_PS: u32 = 8;

/// Mains frequency. The engine is fixed to one frequency.
pub const MAINS_FREQ: u32 = 50;

/// Mains half-wave duration in timer ticks.
pub const TICKS_PER_HALFCYCLE: u16 = (FCPU / TC1_PS / (MAINS_FREQ * 2)) as u16;

/// Full mains period in timer ticks.
const TICKS_PER_PERIOD: u16 = TICKS_PER_HALFCYCLE * 2;

static MONITOR: Mutex<Cell<ZeroCrossMonitor>> =
    Mutex::new(Cell::new(ZeroCrossMonitor::new(TICKS_PER_HALFCYCLE)));
static PREV_EDGE: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));

/// Input capture: the zero-cross detector pulled ICP1 low.
///
/// The captured counter value timestamps the edge exactly,
/// independent of the interrupt latency. The distance to the previous
/// accepted capture is the phase clock the monitor judges.
pub fn irq_handler_timer1_capt(cs: CriticalSection<'_>) {
    // SAFETY: The timer registers are only accessed from the
    //         interrupt handlers after init.
    let dp = unsafe { hw::periph() };

    let captured = dp.TC1.icr1().read().bits();
    let elapsed = captured.wrapping_sub(PREV_EDGE.borrow(cs).get());

    let mut monitor = MONITOR.borrow(cs).get();
    let edge = monitor.edge(elapsed);
    MONITOR.borrow(cs).set(monitor);

    if edge == Edge::Accepted {
        PREV_EDGE.borrow(cs).set(captured);
        // Rearm the period watchdog one full period after this
        // crossing. It only ever fires if the next crossing goes
        // missing.
        dp.TC1
            .ocr1b()
            .write(|w| w.set(captured.wrapping_add(TICKS_PER_PERIOD)));
        dp.TC1.tifr().write(|w| w.ocf1b().set_bit());

        triac::crossing(cs, captured);
    }
}

/// Compare B: a full mains period has passed without an accepted
/// crossing. The next edge resynchronizes unconditionally.
pub fn irq_handler_timer1_compb(cs: CriticalSection<'_>) {
    let mut monitor = MONITOR.borrow(cs).get();
    monitor.timeout();
    MONITOR.borrow(cs).set(monitor);
}

// vim: ts=4 sw=4 expandtab
