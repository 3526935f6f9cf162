use crate::DelayTicks;

/// Fixed bus address of the dimmer coprocessor.
pub const BUS_ADDRESS: u8 = 0x36;

/// Number of register bytes.
pub const NUM_REGS: u8 = 2;

/// The two-byte register file of the coprocessor.
///
/// The registers hold the firing delay big-endian: register 0 is the
/// high byte, register 1 the low byte. All-ones means off, zero means
/// full on. Writes advance an internal byte pointer that wraps after
/// the second byte; an address match rewinds it. Any stop condition
/// commits the currently written bytes as the new delay.
#[derive(Copy, Clone)]
pub struct DelayRegisters {
    regs: [u8; NUM_REGS as usize],
    ptr: u8,
    dirty: bool,
}

impl DelayRegisters {
    /// Power up with all-ones registers, so an unconfigured device
    /// never fires.
    pub const fn new() -> Self {
        Self {
            regs: [0xFF; NUM_REGS as usize],
            ptr: 0,
            dirty: false,
        }
    }

    /// Address match: a transaction begins.
    pub fn start(&mut self) {
        self.ptr = 0;
    }

    /// One data byte written by the bus master.
    pub fn write(&mut self, data: u8) {
        self.regs[self.ptr as usize] = data;
        self.advance();
        self.dirty = true;
    }

    /// One data byte read back by the bus master.
    pub fn read(&mut self) -> u8 {
        let data = self.regs[self.ptr as usize];
        self.advance();
        data
    }

    /// Stop condition: commit. Returns the new delay if any byte was
    /// written since the last commit.
    pub fn stop(&mut self) -> Option<DelayTicks> {
        if self.dirty {
            self.dirty = false;
            Some(DelayTicks(u16::from_be_bytes(self.regs)))
        } else {
            None
        }
    }

    fn advance(&mut self) {
        self.ptr += 1;
        if self.ptr >= NUM_REGS {
            self.ptr = 0;
        }
    }
}

impl Default for DelayRegisters {
    fn default() -> Self {
        Self::new()
    }
}

/// Master side encoding of a delay into the register pair.
pub fn encode(delay: DelayTicks) -> [u8; NUM_REGS as usize] {
    delay.ticks().to_be_bytes()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_commit_on_stop() {
        let mut regs = DelayRegisters::new();
        regs.start();
        regs.write(0x13);
        regs.write(0x88);
        assert_eq!(regs.stop(), Some(DelayTicks(0x1388)));
        // Nothing new written, the stop of a later read transaction
        // commits nothing.
        assert_eq!(regs.stop(), None);
    }

    #[test]
    fn test_pointer_wraps() {
        let mut regs = DelayRegisters::new();
        regs.start();
        regs.write(0x11);
        regs.write(0x22);
        regs.write(0x33); // wraps back onto register 0
        assert_eq!(regs.stop(), Some(DelayTicks(0x3322)));
    }

    #[test]
    fn test_partial_write_commits() {
        let mut regs = DelayRegisters::new();
        regs.start();
        regs.write(0x12);
        regs.write(0x34);
        regs.stop();

        // A single byte transaction updates only the high byte.
        regs.start();
        regs.write(0x56);
        assert_eq!(regs.stop(), Some(DelayTicks(0x5634)));
    }

    #[test]
    fn test_address_match_rewinds_pointer() {
        let mut regs = DelayRegisters::new();
        regs.start();
        regs.write(0xAB);
        // Master restarts the transaction from register 0.
        regs.start();
        regs.write(0x13);
        regs.write(0x88);
        assert_eq!(regs.stop(), Some(DelayTicks(0x1388)));
    }

    #[test]
    fn test_read_back() {
        let mut regs = DelayRegisters::new();
        regs.start();
        regs.write(0x13);
        regs.write(0x88);
        regs.stop();

        regs.start();
        assert_eq!(regs.read(), 0x13);
        assert_eq!(regs.read(), 0x88);
        assert_eq!(regs.read(), 0x13);
        assert_eq!(regs.stop(), None);
    }

    #[test]
    fn test_powerup_is_off() {
        let mut regs = DelayRegisters::new();
        regs.start();
        assert_eq!(regs.read(), 0xFF);
        assert_eq!(regs.read(), 0xFF);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(DelayTicks(0x1388)), [0x13, 0x88]);
        assert_eq!(encode(DelayTicks::OFF), [0xFF, 0xFF]);
        assert_eq!(encode(DelayTicks::FULL_ON), [0x00, 0x00]);
    }
}

// vim: ts=4 sw=4 expandtab
