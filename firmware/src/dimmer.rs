// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    exint,
    hw::interrupt,
    mains::TICKS_PER_HALFCYCLE,
    mutex::{CriticalSection, MainCtx, Mutex, MutexCell, MutexRefCell},
    ports::PORTB,
    timer::{LargeTimestamp, RelLargeTimestamp, timer_enable_compare_irqs, timer_get_large},
};
use avr_atomic::AvrAtomic;
use core::cell::Cell;
use dimcore::{
    DelayTicks,
    control::{DimControl, StateChangedHandler, TICK_INTERVAL_MS},
};

/// Pin not configured.
const PIN_NONE: u8 = 0xFF;

/// Port A pins selectable as zero-cross sense input.
/// PA0 and PA3 (AREF) are reserved by the board.
const VALID_ZERO_PINS: u8 = 0b0000_0110; // PA1, PA2

/// Port B pins selectable as triac gate output.
/// The rest of port B is ISP, UART, XTAL and RESET.
const VALID_FIRING_PINS: u8 = 0b0100_1000; // PB3, PB6

/// Duration of one brightness tick in timer ticks.
const TICK_DUR: RelLargeTimestamp = RelLargeTimestamp::from_millis(TICK_INTERVAL_MS as i32);

/// The firing delay published to the interrupt context, in timer
/// ticks. This is the only state shared between the tick handler and
/// the zero-cross interrupt. It is read exactly once per accepted
/// crossing.
static DELAY_TICKS: AvrAtomic<u16> = AvrAtomic::new();

static ZERO_PIN: Mutex<Cell<u8>> = Mutex::new(Cell::new(PIN_NONE));
static FIRING_PIN: Mutex<Cell<u8>> = Mutex::new(Cell::new(PIN_NONE));

/// The configured zero-cross sense pin (port A bit).
pub fn zero_cross_pin(cs: CriticalSection<'_>) -> Option<u8> {
    match ZERO_PIN.borrow(cs).get() {
        PIN_NONE => None,
        pin => Some(pin),
    }
}

/// The configured triac gate pin (port B bit).
pub fn firing_pin(cs: CriticalSection<'_>) -> Option<u8> {
    match FIRING_PIN.borrow(cs).get() {
        PIN_NONE => None,
        pin => Some(pin),
    }
}

/// Read the published firing delay. Callable from any context.
#[inline(always)]
pub fn published_delay() -> u16 {
    DELAY_TICKS.load()
}

/// The dimmer facade.
///
/// Owns the brightness state machine, the tick scheduling and the
/// published delay. All methods must be called from the main context.
///
/// The state change handler is invoked synchronously from within the
/// mutating call. It must not call back into the facade.
pub struct Dimmer {
    control: MutexRefCell<DimControl>,
    initialized: MutexCell<bool>,
    next_tick: MutexCell<LargeTimestamp>,
    millis: MutexCell<u32>,
    last_delay: MutexCell<u16>,
}

impl Dimmer {
    pub const fn new() -> Self {
        Self {
            control: MutexRefCell::new(DimControl::new(TICKS_PER_HALFCYCLE)),
            initialized: MutexCell::new(false),
            next_tick: MutexCell::new(LargeTimestamp::new()),
            millis: MutexCell::new(0),
            last_delay: MutexCell::new(DelayTicks::OFF.ticks()),
        }
    }

    /// Select the zero-cross sense and triac gate pins.
    ///
    /// An unsupported pin pair is rejected and the old assignment is
    /// kept; the dimmer then stays uninitialized and inert. The pins
    /// cannot be changed anymore once begin() succeeded.
    ///
    /// Returns whether the stored assignment changed.
    pub fn use_pins(&self, m: &MainCtx<'_>, zero: u8, firing: u8) -> bool {
        if self.initialized.get(m) {
            return false;
        }
        if zero >= 8 || firing >= 8 {
            return false;
        }
        if VALID_ZERO_PINS & (1 << zero) == 0 || VALID_FIRING_PINS & (1 << firing) == 0 {
            return false;
        }
        interrupt::free(|cs| {
            let changed =
                ZERO_PIN.borrow(cs).get() != zero || FIRING_PIN.borrow(cs).get() != firing;
            ZERO_PIN.borrow(cs).set(zero);
            FIRING_PIN.borrow(cs).set(firing);
            changed
        })
    }

    /// Start the engine.
    ///
    /// Without a valid pin configuration this does nothing and the
    /// dimmer stays uninitialized: every operation remains a no-op and
    /// the gate is never asserted. The caller detects this through
    /// is_initialized().
    pub fn begin(&self, m: &MainCtx<'_>) {
        if self.initialized.get(m) {
            return;
        }
        let (zero, firing) = interrupt::free(|cs| {
            (ZERO_PIN.borrow(cs).get(), FIRING_PIN.borrow(cs).get())
        });
        if zero == PIN_NONE || firing == PIN_NONE {
            return;
        }

        DELAY_TICKS.store(DelayTicks::OFF.ticks());

        // Gate low before the pin turns into an output. The interrupt
        // handlers are the only other writers of port B.
        interrupt::free(|_| {
            PORTB.set(firing as usize, false);
            PORTB.output(firing as usize);
        });

        timer_enable_compare_irqs(m);
        exint::enable_zero_cross(m, zero);

        self.next_tick.set(m, timer_get_large(m) + TICK_DUR);
        self.initialized.set(m, true);
    }

    pub fn is_initialized(&self, m: &MainCtx<'_>) -> bool {
        self.initialized.get(m)
    }

    pub fn is_on(&self, m: &MainCtx<'_>) -> bool {
        self.control.borrow(m).is_on()
    }

    pub fn get_brightness(&self, m: &MainCtx<'_>) -> u8 {
        self.control.borrow(m).brightness()
    }

    pub fn set_on(&self, m: &MainCtx<'_>, on: bool) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).set_on(on);
        }
    }

    pub fn toggle(&self, m: &MainCtx<'_>) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).toggle();
        }
    }

    pub fn set_brightness(&self, m: &MainCtx<'_>, level: u8) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).set_brightness(level);
        }
    }

    pub fn change_brightness(&self, m: &MainCtx<'_>, delta: i8) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).change_brightness(delta);
        }
    }

    /// Install a temporary brightness floor, e.g. for press-and-hold
    /// gestures that must not commit a new persistent target.
    pub fn set_min_brightness_for(&self, m: &MainCtx<'_>, level: u8, timeout_secs: u16) {
        if self.initialized.get(m) {
            let now_ms = self.millis.get(m);
            self.control
                .borrow_mut(m)
                .set_min_brightness_for(level, timeout_secs, now_ms);
        }
    }

    pub fn set_min_max(&self, m: &MainCtx<'_>, min: u8, max: u8) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).set_min_max(min, max);
        }
    }

    /// Replace the brightness curve. A table that is not exactly 100
    /// entries long is ignored and the installed curve is kept.
    pub fn set_brightness_curve(&self, m: &MainCtx<'_>, table: &[u16]) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).set_curve(table);
        }
    }

    /// Register the state change handler. A single slot: a new
    /// registration replaces the previous one.
    pub fn on_state_changed(&self, m: &MainCtx<'_>, handler: StateChangedHandler) {
        if self.initialized.get(m) {
            self.control.borrow_mut(m).on_state_changed(handler);
        }
    }

    /// Main loop duty. Runs the brightness tick at its fixed cadence
    /// and publishes the resulting delay to the interrupt context.
    pub fn run(&self, m: &MainCtx<'_>) {
        if !self.initialized.get(m) {
            return;
        }
        let now = timer_get_large(m);
        if now < self.next_tick.get(m) {
            return;
        }
        self.next_tick.set(m, self.next_tick.get(m) + TICK_DUR);

        let now_ms = self.millis.get(m).wrapping_add(TICK_INTERVAL_MS);
        self.millis.set(m, now_ms);

        let delay = self.control.borrow_mut(m).tick(now_ms);

        // Only touch the shared cell when the delay actually moved.
        if delay.ticks() != self.last_delay.get(m) {
            self.last_delay.set(m, delay.ticks());
            DELAY_TICKS.store(delay.ticks());
        }

        #[cfg(feature = "debug")]
        {
            use crate::{debug::Debug, mains};

            let control = self.control.borrow(m);
            Debug::TargetBrightness.log_u8(control.brightness());
            Debug::CurrentBrightness.log_u8(control.current_brightness());
            Debug::DelayTicks.log_u16(delay.ticks());
            Debug::Synchronized.log_u8(interrupt::free(mains::synchronized) as u8);
        }
    }
}

// vim: ts=4 sw=4 expandtab
