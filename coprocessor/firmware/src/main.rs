#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

//! Dimmer coprocessor.
//!
//! Runs the zero-cross monitor and the firing sequencer on a
//! dedicated controller for hosts that cannot bound their interrupt
//! latency. The only interface is the two byte delay register file on
//! the TWI bus; see dimcore::regs. Everything is interrupt driven,
//! the main loop has no duties after init.
//!
//! Pinout:
//! - PB0: zero-cross sense (ICP1), falling edge active
//! - PB1: triac gate, active high
//! - PC4/PC5: TWI SDA/SCL

mod hw;
mod mains;
mod triac;
mod twi;

use crate::{
    hw::{Peripherals, interrupt, mcu},
    mains::TICKS_PER_HALFCYCLE,
};

/// # Safety
///
/// Must only be called during init with IRQs disabled.
unsafe fn ports_init(pb: &mcu::PORTB, pc: &mcu::PORTC) {
    fn pin_input(_bit: usize) -> u8 {
        0
    }
    fn pin_output(bit: usize) -> u8 {
        1 << bit
    }
    fn pin_low(_bit: usize) -> u8 {
        0
    }
    fn pin_floating(_bit: usize) -> u8 {
        0
    }

    // PORTB
    pb.portb().write(|w| {
        w.set(
            pin_floating(0) | // zero-cross sense (ICP1)
            pin_low(1) | // triac gate
            pin_low(2) | // n/c
            pin_low(3) | // ISP MOSI
            pin_low(4) | // ISP MISO
            pin_low(5), // ISP SCK
        )
    });
    pb.ddrb().write(|w| {
        w.set(
            pin_input(0) | // zero-cross sense (ICP1)
            pin_output(1) | // triac gate
            pin_output(2) | // n/c
            pin_output(3) | // ISP MOSI
            pin_output(4) | // ISP MISO
            pin_output(5), // ISP SCK
        )
    });

    // PORTC
    pc.portc().write(|w| {
        w.set(
            pin_low(0) | // n/c
            pin_low(1) | // n/c
            pin_low(2) | // n/c
            pin_low(3) | // n/c
            pin_floating(4) | // TWI SDA
            pin_floating(5), // TWI SCL
        )
    });
    pc.ddrc().write(|w| {
        w.set(
            pin_output(0) | // n/c
            pin_output(1) | // n/c
            pin_output(2) | // n/c
            pin_output(3) | // n/c
            pin_input(4) | // TWI SDA
            pin_input(5), // TWI SCL
        )
    });
}

#[rustfmt::skip]
fn timer1_init(tc1: &mcu::TC1) {
    // Free running at 1 us per tick. The input capture timestamps the
    // zero-cross edges (falling, noise canceled); the compare
    // channels are armed by the firing and mains logic.
    tc1.tccr1a().write(|w| w);
    tc1.tccr1b().write(|w| {
        w.cs1().prescale_8()
         .icnc1().set_bit()
    });
    tc1.ocr1a().write(|w| w.set(0xFFFF));
    tc1.ocr1b().write(|w| w.set(TICKS_PER_HALFCYCLE * 2));
    tc1.timsk().write(|w| {
        w.ticie1().set_bit()
         .ocie1a().set_bit()
         .ocie1b().set_bit()
    });
}

#[avr_device::entry]
fn main() -> ! {
    let dp = Peripherals::take().unwrap();

    // SAFETY: We are running in init with IRQs disabled.
    unsafe {
        ports_init(&dp.PORTB, &dp.PORTC);
    }
    timer1_init(&dp.TC1);
    twi::twi_init(&dp.TWI);

    // SAFETY: Init is done, the ISRs may run now. They own all
    //         peripherals from here on.
    unsafe { interrupt::enable() };

    loop {
        avr_device::asm::nop();
    }
}

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// vim: ts=4 sw=4 expandtab
