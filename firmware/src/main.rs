#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

#[cfg(feature = "debug")]
mod debug;
mod dimmer;
mod exint;
mod hw;
mod mains;
#[cfg(feature = "monitoring")]
mod mon;
mod mutex;
mod ports;
mod timer;
mod triac;
#[cfg(feature = "debug")]
mod usi_uart;

use crate::{
    dimmer::Dimmer,
    exint::{EXINT, ExInt},
    hw::{Peripherals, interrupt, mcu},
    mutex::{MainCtx, unwrap_option},
    ports::{PORTA, PORTB, PortA, PortB},
    timer::{DP as TIMER_DP, Dp as TimerDp, timer_init},
};

/// Default pin assignment: zero-cross sense on PA1, triac gate on PB3.
const DEFAULT_PIN_ZERO: u8 = 1;
const DEFAULT_PIN_TRIAC: u8 = 3;

static DIMMER: Dimmer = Dimmer::new();

#[cfg(feature = "monitoring")]
static MON: mon::Mon = mon::Mon::new();

fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT registers
    //         which are not accessed from anywhere else in the program.
    unsafe {
        // Enable WDT with timeout 32.5 ms
        core::arch::asm!(
            "ldi {tmp}, 0x10", // WDCE=1
            "out {WDTCR}, {tmp}",
            "ldi {tmp}, 0x19", // WDCE=1, WDE=1, WDP2=0, WDP1=0, WDP0=1
            "out {WDTCR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCR = const 0x21,
            options(nostack, preserves_flags)
        );
    }
}

fn wdt_poke(_wp: &mcu::WDT) {
    avr_device::asm::wdr();
}

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let init_static_vars = |ctx| {
        TIMER_DP.init(ctx, TimerDp { TC1: dp.TC1 });

        let porta = PortA { PORTA: dp.PORTA };
        porta.setup(ctx);
        PORTA.init(ctx, porta);

        let portb = PortB { PORTB: dp.PORTB };
        portb.setup(ctx);
        PORTB.init(ctx, portb);

        let exint = ExInt { EXINT: dp.EXINT };
        exint.setup(ctx);
        EXINT.init(ctx, exint);

        #[cfg(feature = "debug")]
        {
            let uart = usi_uart::Dp {
                USI: dp.USI,
                TC0: dp.TC0,
            };
            uart.setup(ctx);
            usi_uart::DP.init(ctx, uart);
        }
    };

    // # SAFETY
    //
    // This is the context handle for the main() function.
    // Holding a reference to this object proves that the holder
    // is running in main() context.
    let m = unsafe { MainCtx::new_with_init(init_static_vars) };

    timer_init(&m);

    #[cfg(feature = "monitoring")]
    MON.init(&m, timer::timer_get_large(&m));

    #[cfg(feature = "debug")]
    debug::debug_init(&m);

    // The switch logic hands us the pin configuration. Stand-alone
    // builds run with the board defaults.
    DIMMER.use_pins(&m, DEFAULT_PIN_ZERO, DEFAULT_PIN_TRIAC);
    DIMMER.begin(&m);

    // SAFETY: This must be after construction of MainCtx
    //         and after initialization of static MainInit variables.
    unsafe { interrupt::enable() };

    loop {
        DIMMER.run(&m);
        #[cfg(feature = "monitoring")]
        MON.check(&m);
        wdt_poke(&dp.WDT);
    }
}

// vim: ts=4 sw=4 expandtab
