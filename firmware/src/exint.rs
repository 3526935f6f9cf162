use crate::{
    hw::mcu,
    mutex::{LazyMainInit, MainCtx, MainInitCtx},
};

#[allow(non_snake_case)]
pub struct ExInt {
    pub EXINT: mcu::EXINT,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static EXINT: LazyMainInit<ExInt> = unsafe { LazyMainInit::uninit() };

impl ExInt {
    pub fn setup(&self, _: &MainInitCtx) {
        // All pin change sources masked until begin() selects the
        // zero-cross pin.
        self.EXINT.pcmsk0().write(|w| w.set(0));
        self.EXINT.pcmsk1().write(|w| w.set(0));
    }
}

/// Route the pin change interrupt to the zero-cross sense pin
/// (port A bit) and enable it.
///
/// Must be called with the gate and firing logic already set up,
/// because crossings start being delivered right away.
pub fn enable_zero_cross(m: &MainCtx, pin: u8) {
    let exint = EXINT.deref(m);
    exint.EXINT.pcmsk0().write(|w| w.set(1 << pin));
    exint.EXINT.pcmsk1().write(|w| w.set(0));
    exint.EXINT.gifr().write(|w| w.pcif().set_bit());
    exint.EXINT.gimsk().write(|w| w.pcie().set(0x3));
}

// vim: ts=4 sw=4 expandtab
