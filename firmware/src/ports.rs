// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::mcu,
    mutex::{AnyCtx, LazyMainInit, MainInitCtx},
};

#[rustfmt::skip]
macro_rules! impl_port {
    (
        $struct:ident,
        $name:ident,
        $port:ident,
        $pin:ident,
        $ddr:ident,
        $bit0:ident,
        $bit1:ident,
        $bit2:ident,
        $bit3:ident,
        $bit4:ident,
        $bit5:ident,
        $bit6:ident,
        $bit7:ident
    ) => {
        #[allow(non_snake_case)]
        pub struct $struct {
            pub $name: mcu::$name,
        }

        // SAFETY: Is initialized when constructing the MainCtx.
        pub static $name: LazyMainInit<$struct> = unsafe { LazyMainInit::uninit() };

        impl LazyMainInit<$struct> {
            /// Access the port peripheral from any context.
            ///
            /// The port accessors are called from interrupt handlers
            /// and from main code inside critical sections, so there
            /// is no concurrent read-modify-write on the registers.
            #[inline(always)]
            fn p(&self) -> &mcu::$name {
                // SAFETY: See above. All callers run with interrupts
                //         masked or during init, so pretending to be
                //         the main context is safe here.
                let m = unsafe { AnyCtx::new().to_main_ctx() };
                &self.deref(&m).$name
            }

            #[inline(always)]
            #[allow(dead_code)]
            pub fn get(&self, bit: usize) -> bool {
                match bit {
                    0 => self.p().$pin().read().$bit0().bit(),
                    1 => self.p().$pin().read().$bit1().bit(),
                    2 => self.p().$pin().read().$bit2().bit(),
                    3 => self.p().$pin().read().$bit3().bit(),
                    4 => self.p().$pin().read().$bit4().bit(),
                    5 => self.p().$pin().read().$bit5().bit(),
                    6 => self.p().$pin().read().$bit6().bit(),
                    7 => self.p().$pin().read().$bit7().bit(),
                    _ => unreachable!(),
                }
            }

            #[inline(always)]
            #[allow(dead_code)]
            pub fn set(&self, bit: usize, value: bool) {
                match bit {
                    0 => self.p().$port().modify(|_, w| w.$bit0().bit(value)),
                    1 => self.p().$port().modify(|_, w| w.$bit1().bit(value)),
                    2 => self.p().$port().modify(|_, w| w.$bit2().bit(value)),
                    3 => self.p().$port().modify(|_, w| w.$bit3().bit(value)),
                    4 => self.p().$port().modify(|_, w| w.$bit4().bit(value)),
                    5 => self.p().$port().modify(|_, w| w.$bit5().bit(value)),
                    6 => self.p().$port().modify(|_, w| w.$bit6().bit(value)),
                    7 => self.p().$port().modify(|_, w| w.$bit7().bit(value)),
                    _ => unreachable!(),
                };
            }

            #[inline(always)]
            #[allow(dead_code)]
            pub fn output(&self, bit: usize) {
                match bit {
                    0 => self.p().$ddr().modify(|_, w| w.$bit0().set_bit()),
                    1 => self.p().$ddr().modify(|_, w| w.$bit1().set_bit()),
                    2 => self.p().$ddr().modify(|_, w| w.$bit2().set_bit()),
                    3 => self.p().$ddr().modify(|_, w| w.$bit3().set_bit()),
                    4 => self.p().$ddr().modify(|_, w| w.$bit4().set_bit()),
                    5 => self.p().$ddr().modify(|_, w| w.$bit5().set_bit()),
                    6 => self.p().$ddr().modify(|_, w| w.$bit6().set_bit()),
                    7 => self.p().$ddr().modify(|_, w| w.$bit7().set_bit()),
                    _ => unreachable!(),
                };
            }

            #[inline(always)]
            #[allow(dead_code)]
            pub fn input(&self, bit: usize) {
                match bit {
                    0 => self.p().$ddr().modify(|_, w| w.$bit0().clear_bit()),
                    1 => self.p().$ddr().modify(|_, w| w.$bit1().clear_bit()),
                    2 => self.p().$ddr().modify(|_, w| w.$bit2().clear_bit()),
                    3 => self.p().$ddr().modify(|_, w| w.$bit3().clear_bit()),
                    4 => self.p().$ddr().modify(|_, w| w.$bit4().clear_bit()),
                    5 => self.p().$ddr().modify(|_, w| w.$bit5().clear_bit()),
                    6 => self.p().$ddr().modify(|_, w| w.$bit6().clear_bit()),
                    7 => self.p().$ddr().modify(|_, w| w.$bit7().clear_bit()),
                    _ => unreachable!(),
                };
            }
        }
    };
}

impl_port!(
    PortA, PORTA, porta, pina, ddra, pa0, pa1, pa2, pa3, pa4, pa5, pa6, pa7
);
impl_port!(
    PortB, PORTB, portb, pinb, ddrb, pb0, pb1, pb2, pb3, pb4, pb5, pb6, pb7
);

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
fn pin_pullup(bit: usize) -> u8 {
    1 << bit
}

impl PortA {
    pub fn setup(&self, _: &MainInitCtx) {
        // All of port A starts as input. The zero-cross sense input is
        // selected at runtime (use_pins); its pullup stays off, the
        // detector drives the pin actively.
        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        unsafe {
            self.PORTA.porta().write(|w| {
                w.set(
                    pin_floating(0) | // DNC
                    pin_floating(1) | // zero-cross sense (default)
                    pin_floating(2) | // DNC, alternate zero-cross sense
                    pin_floating(3) | // AREF
                    pin_floating(4) | // DNC
                    pin_floating(5) | // DNC
                    pin_floating(6) | // DNC
                    pin_floating(7), // DNC
                )
            });
            self.PORTA.ddra().write(|w| {
                w.set(
                    pin_input(0) | // DNC
                    pin_input(1) | // zero-cross sense (default)
                    pin_input(2) | // DNC, alternate zero-cross sense
                    pin_input(3) | // AREF
                    pin_input(4) | // DNC
                    pin_input(5) | // DNC
                    pin_input(6) | // DNC
                    pin_input(7), // DNC
                )
            });
        }
    }
}

impl PortB {
    pub fn setup(&self, _: &MainInitCtx) {
        // The triac gate pin is selected at runtime (use_pins) and
        // switched to output by begin(). Until then it stays a low
        // input; the gate driver has an external pulldown.
        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        unsafe {
            self.PORTB.portb().write(|w| {
                w.set(
                    pin_low(0) | // ISP MOSI + UART DI
                    pin_pullup(1) | // ISP MISO + UART DO
                    pin_low(2) | // ISP SCK
                    pin_low(3) | // triac gate (default), active high
                    pin_floating(4) | // XTAL1
                    pin_floating(5) | // XTAL2
                    pin_low(6) | // triac gate (alternate)
                    pin_floating(7), // RESET, Debug-Wire
                )
            });
            self.PORTB.ddrb().write(|w| {
                w.set(
                    pin_input(0) | // ISP MOSI + UART DI
                    pin_input(1) | // ISP MISO + UART DO
                    pin_output(2) | // ISP SCK
                    pin_input(3) | // triac gate (default)
                    pin_input(4) | // XTAL1
                    pin_input(5) | // XTAL2
                    pin_input(6) | // triac gate (alternate)
                    pin_input(7), // RESET, Debug-Wire
                )
            });
        }
    }
}

// vim: ts=4 sw=4 expandtab
