// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transmit-only software UART on the USI, clocked by timer 0.
//! Carries the debug value stream, nothing else.

use crate::{
    debug,
    hw::mcu,
    mutex::{AnyCtx, CriticalSection, IrqCtx, LazyMainInit, MainInitCtx, Mutex},
    ports::PORTB,
};
use core::cell::Cell;

const FCPU: u32 = 16_000_000;
const BAUD: u32 = 19_200;
const PORTB_BIT: usize = 1;
const TC0_PS: u32 = 8;
const TC0_OCR: u8 = (FCPU / (BAUD * TC0_PS)) as u8;

#[allow(non_snake_case)]
pub struct Dp {
    pub USI: mcu::USI,
    pub TC0: mcu::TC0,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static DP: LazyMainInit<Dp> = unsafe { LazyMainInit::uninit() };

impl Dp {
    pub fn setup(&self, _c: &MainInitCtx) {
        self.USI.usidr().write(|w| w.set(0xFF));
    }
}

#[inline(always)]
fn with_dp<R>(f: impl FnOnce(&Dp) -> R) -> R {
    // SAFETY: All callers run with interrupts masked (ISR or
    //         interrupt::free) and the UART peripherals are not
    //         touched from anywhere else. Pretending to be the main
    //         context is safe here.
    let m = unsafe { AnyCtx::new().to_main_ctx() };
    f(DP.deref(&m))
}

fn bit_rev(mut data: u8) -> u8 {
    data = (data & 0xF0) >> 4 | (data & 0x0F) << 4;
    data = (data & 0xCC) >> 2 | (data & 0x33) << 2;
    data = (data & 0xAA) >> 1 | (data & 0x55) << 1;
    data
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mode {
    Idle,
    Tx0,
    Tx1,
}

static MODE: Mutex<Cell<Mode>> = Mutex::new(Cell::new(Mode::Idle));
static TXDATA: Mutex<Cell<u8>> = Mutex::new(Cell::new(0));

#[rustfmt::skip]
pub fn irq_handler_usi_ovf(c: &IrqCtx) {
    let cs = c.cs();
    let mode = MODE.borrow(cs);
    match mode.get() {
        Mode::Idle => (),
        Mode::Tx0 => {
            // First half done. Shift out the low bits plus stop bit.
            let data = TXDATA.borrow(cs).get();
            with_dp(|dp| {
                dp.USI.usidr().write(|w| w.set((data << 3) | 0x07));
                dp.USI.usisr().write(|w| {
                    w.usicnt().set(16 - 6)
                     .usioif().set_bit()
                });
            });

            mode.set(Mode::Tx1);
        }
        Mode::Tx1 => {
            // Frame complete. Release the line and stop the baud clock.
            with_dp(|dp| {
                dp.USI.usidr().write(|w| w.set(0xFF));
                dp.USI.usicr().modify(|_, w| w.usioie().clear_bit());
                dp.USI.usisr().modify(|_, w| w.usioif().set_bit());

                dp.TC0.tccr0b().write(|w| w);
            });

            PORTB.set(PORTB_BIT, true);
            PORTB.input(PORTB_BIT);

            mode.set(Mode::Idle);
            debug::tx_complete_callback(c);
        }
    }
}

/// Start the transmission of one byte.
///
/// The caller must hold a genuine critical section. Returns false if
/// a transmission is still in flight.
#[rustfmt::skip]
pub fn uart_tx_cs(cs: CriticalSection<'_>, mut data: u8) -> bool {
    let mode = MODE.borrow(cs);
    match mode.get() {
        Mode::Idle => {
            data = bit_rev(data);
            TXDATA.borrow(cs).set(data);

            with_dp(|dp| {
                dp.TC0.tccr0b().write(|w| w);
            });

            PORTB.set(PORTB_BIT, true);
            PORTB.output(PORTB_BIT);

            with_dp(|dp| {
                // Start bit plus the high bits of the frame.
                dp.USI.usidr().write(|w| w.set((data >> 2) | 0x80));
                dp.USI.usisr().write(|w| {
                    w.usicnt().set(16 - 5)
                     .usioif().set_bit()
                });
                dp.USI.usicr().write(|w| {
                    w.usioie().set_bit()
                     .usiwm().three_wire()
                     .usics().tc0()
                });
                dp.USI.usipp().write(|w| w);

                dp.TC0.tccr0a().write(|w| w.ctc0().set_bit());
                dp.TC0.tcnt0h().write(|w| w);
                dp.TC0.tcnt0l().write(|w| w);
                dp.TC0.ocr0a().write(|w| w.set(TC0_OCR));
                dp.TC0.tccr0b().write(|w| w.cs0().prescale_8());
            });

            mode.set(Mode::Tx0);
            true
        }
        Mode::Tx0 | Mode::Tx1 => false, // busy
    }
}

// vim: ts=4 sw=4 expandtab
