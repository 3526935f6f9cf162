// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    mutex::{MainCtx, MutexCell, reset_system},
    timer::{LargeTimestamp, RelLargeTimestamp, timer_get_large},
};
use avr_stack::estimate_unused_stack_space;

/// Distance between monitoring checks.
const CHECK_DIST: RelLargeTimestamp = RelLargeTimestamp::from_millis(20);
/// Immediate fault, if one actual monitoring distance is bigger than this.
/// A stalled main loop means the brightness tick cadence is broken.
const CHECK_TIMEOUT: RelLargeTimestamp = RelLargeTimestamp::from_millis(100);

/// Minimum amount of CPU stack space that must be free all the time.
/// Immediate fault, if less stack space is free.
const MIN_STACK_SPACE: u16 = 64;

/// Runtime self checks.
///
/// Only the execution environment is monitored here. A missing or
/// unstable mains zero-cross is *not* a fault: the synchronization
/// logic absorbs it and the gate simply stays off meanwhile.
pub struct Mon {
    prev_check: MutexCell<LargeTimestamp>,
}

impl Mon {
    pub const fn new() -> Self {
        Self {
            prev_check: MutexCell::new(LargeTimestamp::new()),
        }
    }

    pub fn init(&self, m: &MainCtx<'_>, now: LargeTimestamp) {
        self.prev_check.set(m, now);
    }

    pub fn check(&self, m: &MainCtx<'_>) {
        let now = timer_get_large(m);
        let prev_check = self.prev_check.get(m);

        // Check if the distance between monitoring checks is too big.
        if now > prev_check + CHECK_TIMEOUT {
            reset_system();
        }

        // Check if we need to do the monitoring checks now.
        let next_check = prev_check + CHECK_DIST;
        if now >= next_check {
            self.prev_check.set(m, next_check);

            // Check if stack usage was too large.
            let unused_stack_bytes = estimate_unused_stack_space();
            if unused_stack_bytes < MIN_STACK_SPACE {
                reset_system();
            }

            #[cfg(feature = "debug")]
            crate::debug::Debug::MinStack.log_u16(unused_stack_bytes);
        }
    }
}

// vim: ts=4 sw=4 expandtab
