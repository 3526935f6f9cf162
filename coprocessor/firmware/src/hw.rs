pub use atmega::{self as mcu, Peripherals};
pub use avr_device::atmega8 as atmega;
pub use avr_device::interrupt::{self, CriticalSection, Mutex};

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(atmega8)]
        fn $name() {
            // SAFETY: We are inside of an interrupt handler with
            //         interrupts globally disabled.
            let cs = unsafe { CriticalSection::new() };
            $handler(cs);
        }
    };
}

define_isr!(TWI, crate::twi::irq_handler_twi);
define_isr!(TIMER1_CAPT, crate::mains::irq_handler_timer1_capt);
define_isr!(TIMER1_COMPA, crate::triac::irq_handler_timer1_compa);
define_isr!(TIMER1_COMPB, crate::mains::irq_handler_timer1_compb);

/// Get the peripherals from interrupt context.
///
/// # SAFETY
///
/// The caller must only access registers that are not concurrently
/// accessed from another context. The interrupt handlers own all
/// peripherals after init; main() does not touch them anymore once
/// interrupts are enabled.
#[inline(always)]
pub unsafe fn periph() -> Peripherals {
    // SAFETY: See above.
    unsafe { Peripherals::steal() }
}

// vim: ts=4 sw=4 expandtab
