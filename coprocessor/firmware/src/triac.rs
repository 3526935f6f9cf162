use crate::{
    hw::{self, CriticalSection, Mutex},
    mains::TICKS_PER_HALFCYCLE,
    twi,
};
use core::cell::Cell;
use dimcore::{
    DelayTicks,
    seq::{CompareAction, CrossingAction, FiringSequencer},
};

/// Gate pulse width in timer ticks (116 us, matched to the gate
/// drive circuit of the reference hardware).
const PULSE_TICKS: u16 = 116;

static SEQ: Mutex<Cell<FiringSequencer>> = Mutex::new(Cell::new(FiringSequencer::new(
    TICKS_PER_HALFCYCLE,
    PULSE_TICKS,
)));

fn set_gate(on: bool) {
    // SAFETY: PB1 is only driven from the interrupt handlers after
    //         init.
    let dp = unsafe { hw::periph() };
    dp.PORTB.portb().modify(|_, w| w.pb1().bit(on));
}

/// An accepted zero-cross at the captured counter value. Sample the
/// committed delay exactly once and decide this half-cycle.
pub fn crossing(cs: CriticalSection<'_>, captured: u16) {
    // SAFETY: See set_gate; timer compare registers are handled by
    //         the interrupt handlers only.
    let dp = unsafe { hw::periph() };

    let delay = DelayTicks(twi::delay_us());

    let mut seq = SEQ.borrow(cs).get();
    let action = seq.crossing(delay);
    SEQ.borrow(cs).set(seq);

    match action {
        CrossingAction::Dark => set_gate(false),
        CrossingAction::Full => set_gate(true),
        CrossingAction::Arm(fire) => {
            set_gate(false);
            dp.TC1
                .ocr1a()
                .write(|w| w.set(captured.wrapping_add(fire)));
            dp.TC1.tifr().write(|w| w.ocf1a().set_bit());
        }
    }
}

/// Compare A: either the firing point or the pulse end.
pub fn irq_handler_timer1_compa(cs: CriticalSection<'_>) {
    // SAFETY: See crossing.
    let dp = unsafe { hw::periph() };

    let mut seq = SEQ.borrow(cs).get();
    let action = seq.compare();
    SEQ.borrow(cs).set(seq);

    match action {
        CompareAction::PulseOn { off_in } => {
            set_gate(true);
            let now = dp.TC1.tcnt1().read().bits();
            dp.TC1.ocr1a().write(|w| w.set(now.wrapping_add(off_in)));
        }
        CompareAction::PulseOff => set_gate(false),
        CompareAction::None => (),
    }
}

// vim: ts=4 sw=4 expandtab
