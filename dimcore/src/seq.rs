use crate::DelayTicks;

/// What the interrupt glue must do at an accepted zero-cross.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CrossingAction {
    /// Deassert the gate. No firing this half-cycle.
    Dark,
    /// Assert the gate and hold it through the whole half-cycle.
    Full,
    /// Deassert the gate and arm the firing compare at this phase
    /// clock value.
    Arm(u16),
}

/// What the interrupt glue must do at a firing compare match.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CompareAction {
    /// Stale compare event. Do nothing.
    None,
    /// Assert the gate and rearm the compare `off_in` ticks from now.
    PulseOn { off_in: u16 },
    /// Deassert the gate. Done for this half-cycle.
    PulseOff,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum State {
    /// Gate off, waiting for the next crossing.
    Idle,
    /// Firing compare armed.
    Armed,
    /// Gate asserted, pulse end compare armed.
    Pulsing,
    /// Gate held on through the half-cycle (full power).
    Hold,
}

/// Per half-cycle firing state machine.
///
/// The new delay is sampled exactly once per accepted crossing, so a
/// delay written mid half-cycle never disturbs a pulse in flight and
/// "off" takes effect only at the next crossing boundary.
#[derive(Copy, Clone)]
pub struct FiringSequencer {
    ticks_per_halfcycle: u16,
    pulse_ticks: u16,
    state: State,
}

impl FiringSequencer {
    pub const fn new(ticks_per_halfcycle: u16, pulse_ticks: u16) -> Self {
        Self {
            ticks_per_halfcycle,
            pulse_ticks,
            state: State::Idle,
        }
    }

    /// Decide the current half-cycle from the delay sampled at an
    /// accepted zero-cross.
    pub fn crossing(&mut self, delay: DelayTicks) -> CrossingAction {
        if delay.is_off() {
            self.state = State::Idle;
            CrossingAction::Dark
        } else if delay.is_full_on() {
            self.state = State::Hold;
            CrossingAction::Full
        } else {
            // The pulse must complete before the next crossing. A
            // delay at or beyond that point still fires late in the
            // half-cycle instead of skipping it.
            let latest = self.ticks_per_halfcycle - self.pulse_ticks - 1;
            self.state = State::Armed;
            CrossingAction::Arm(delay.ticks().min(latest))
        }
    }

    /// Evaluate a firing compare match.
    pub fn compare(&mut self) -> CompareAction {
        match self.state {
            State::Armed => {
                self.state = State::Pulsing;
                CompareAction::PulseOn {
                    off_in: self.pulse_ticks,
                }
            }
            State::Pulsing => {
                self.state = State::Idle;
                CompareAction::PulseOff
            }
            State::Idle | State::Hold => CompareAction::None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_off_stays_dark() {
        let mut seq = FiringSequencer::new(10_000, 116);
        assert_eq!(seq.crossing(DelayTicks::OFF), CrossingAction::Dark);
        // No compare is armed, a stray match changes nothing.
        assert_eq!(seq.compare(), CompareAction::None);
        assert_eq!(seq.crossing(DelayTicks::OFF), CrossingAction::Dark);
    }

    #[test]
    fn test_full_on_holds_gate() {
        let mut seq = FiringSequencer::new(10_000, 116);
        assert_eq!(seq.crossing(DelayTicks::FULL_ON), CrossingAction::Full);
        assert_eq!(seq.compare(), CompareAction::None);
        // Off takes effect at the next crossing boundary.
        assert_eq!(seq.crossing(DelayTicks::OFF), CrossingAction::Dark);
    }

    #[test]
    fn test_pulse_sequence() {
        let mut seq = FiringSequencer::new(10_000, 116);
        assert_eq!(seq.crossing(DelayTicks(5000)), CrossingAction::Arm(5000));
        assert_eq!(seq.compare(), CompareAction::PulseOn { off_in: 116 });
        assert_eq!(seq.compare(), CompareAction::PulseOff);
        assert_eq!(seq.compare(), CompareAction::None);
    }

    #[test]
    fn test_near_end_delay_still_fires() {
        // Ramping through near-zero brightness must not skip the
        // half-cycle; the firing point is clamped so that the pulse
        // still fits.
        let mut seq = FiringSequencer::new(10_000, 116);
        assert_eq!(seq.crossing(DelayTicks(9999)), CrossingAction::Arm(9883));
        assert_eq!(seq.crossing(DelayTicks(9883)), CrossingAction::Arm(9883));
        assert_eq!(seq.crossing(DelayTicks(9882)), CrossingAction::Arm(9882));
    }

    #[test]
    fn test_pulse_in_flight_completes() {
        let mut seq = FiringSequencer::new(10_000, 116);
        seq.crossing(DelayTicks(5000));
        assert_eq!(seq.compare(), CompareAction::PulseOn { off_in: 116 });
        // The shared delay changes to OFF while the gate is asserted.
        // The sequencer never resamples it before the pulse end.
        assert_eq!(seq.compare(), CompareAction::PulseOff);
        // The new value is honored at the next crossing.
        assert_eq!(seq.crossing(DelayTicks::OFF), CrossingAction::Dark);
    }
}

// vim: ts=4 sw=4 expandtab
