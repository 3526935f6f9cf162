// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! TWI slave carrying the two byte delay register file.

use crate::hw::{self, CriticalSection, Mutex, mcu};
use avr_atomic::AvrAtomic;
use core::cell::Cell;
use dimcore::{
    DelayTicks,
    regs::{BUS_ADDRESS, DelayRegisters},
};

// TWI status codes (upper five bits of TWSR), slave mode.
const TW_SR_SLA_ACK: u8 = 0x60; // own address + W received
const TW_SR_DATA_ACK: u8 = 0x80; // data byte received, ACK returned
const TW_SR_STOP: u8 = 0xA0; // stop or repeated start
const TW_ST_SLA_ACK: u8 = 0xA8; // own address + R received
const TW_ST_DATA_ACK: u8 = 0xB8; // data byte transmitted, ACK received
const TW_ST_DATA_NACK: u8 = 0xC0; // data byte transmitted, NACK received
const TW_ST_LAST_DATA: u8 = 0xC8; // last data byte transmitted

static REGS: Mutex<Cell<DelayRegisters>> = Mutex::new(Cell::new(DelayRegisters::new()));

/// The committed firing delay in microseconds from the zero-cross.
/// Written on the bus stop condition, sampled by the zero-cross
/// interrupt. A commit therefore takes effect at the next crossing,
/// never mid half-cycle.
static DELAY_US: AvrAtomic<u16> = AvrAtomic::new();

/// Read the committed delay. Callable from any context.
#[inline(always)]
pub fn delay_us() -> u16 {
    DELAY_US.load()
}

pub fn twi_init(twi: &mcu::TWI) {
    DELAY_US.store(DelayTicks::OFF.ticks());

    twi.twar().write(|w| w.set(BUS_ADDRESS << 1));
    twi.twcr()
        .write(|w| w.twea().set_bit().twen().set_bit().twie().set_bit());
}

pub fn irq_handler_twi(cs: CriticalSection<'_>) {
    // SAFETY: The TWI registers are only accessed from this handler
    //         after init.
    let dp = unsafe { hw::periph() };
    let twi = &dp.TWI;

    let status = twi.twsr().read().bits() & 0xF8;
    let mut regs = REGS.borrow(cs).get();

    match status {
        TW_SR_SLA_ACK => {
            regs.start();
        }
        TW_SR_DATA_ACK => {
            regs.write(twi.twdr().read().bits());
        }
        TW_SR_STOP => {
            if let Some(delay) = regs.stop() {
                DELAY_US.store(delay.ticks());
            }
        }
        TW_ST_SLA_ACK => {
            regs.start();
            twi.twdr().write(|w| w.set(regs.read()));
        }
        TW_ST_DATA_ACK => {
            twi.twdr().write(|w| w.set(regs.read()));
        }
        TW_ST_DATA_NACK | TW_ST_LAST_DATA => (),
        _ => (), // bus error: just re-arm below
    }

    REGS.borrow(cs).set(regs);

    // Release the clock stretch and keep ACKing our address.
    twi.twcr().write(|w| {
        w.twint()
            .set_bit()
            .twea()
            .set_bit()
            .twen()
            .set_bit()
            .twie()
            .set_bit()
    });
}

// vim: ts=4 sw=4 expandtab
