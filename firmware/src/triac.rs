use crate::{
    dimmer,
    mains::TICKS_PER_HALFCYCLE,
    mutex::{CriticalSection, IrqCtx, Mutex},
    ports::PORTB,
    timer::{Timestamp, timer_arm_compa, timer_get},
};
use core::cell::Cell;
use dimcore::{
    DelayTicks,
    seq::{CompareAction, CrossingAction, FiringSequencer},
};

/// Gate pulse width in timer ticks (256 us).
const PULSE_TICKS: u16 = 2;

static SEQ: Mutex<Cell<FiringSequencer>> = Mutex::new(Cell::new(FiringSequencer::new(
    TICKS_PER_HALFCYCLE,
    PULSE_TICKS,
)));

fn set_gate(cs: CriticalSection<'_>, on: bool) {
    if let Some(pin) = dimmer::firing_pin(cs) {
        PORTB.set(pin as usize, on);
    }
}

/// An accepted zero-cross. Sample the published delay exactly once
/// and decide this half-cycle.
pub fn crossing(c: &IrqCtx, now: Timestamp) {
    let cs = c.cs();

    let delay = DelayTicks(dimmer::published_delay());

    let mut seq = SEQ.borrow(cs).get();
    let action = seq.crossing(delay);
    SEQ.borrow(cs).set(seq);

    match action {
        CrossingAction::Dark => set_gate(cs, false),
        CrossingAction::Full => set_gate(cs, true),
        CrossingAction::Arm(fire) => {
            set_gate(cs, false);
            timer_arm_compa(&c.to_any(), Timestamp(now.0.wrapping_add(fire as u8)));
        }
    }
}

/// Compare A: either the firing point or the pulse end.
pub fn irq_handler_timer1_compa(c: &IrqCtx) {
    let cs = c.cs();

    let mut seq = SEQ.borrow(cs).get();
    let action = seq.compare();
    SEQ.borrow(cs).set(seq);

    match action {
        CompareAction::PulseOn { off_in } => {
            set_gate(cs, true);
            let now = timer_get(&c.to_any());
            timer_arm_compa(&c.to_any(), Timestamp(now.0.wrapping_add(off_in as u8)));
        }
        CompareAction::PulseOff => set_gate(cs, false),
        CompareAction::None => (),
    }
}

// vim: ts=4 sw=4 expandtab
