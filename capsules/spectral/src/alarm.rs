// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! One-shot alarm interface the simulated hardware is paced by.
//!
//! This is the subset of the kernel's alarm HIL `SimOps` needs, with ticks
//! kept as a wrapping `u32`. A board backs it with a virtual alarm.

/// A client of an [`Alarm`].
pub trait AlarmClient {
    /// The alarm set with [`Alarm::set_alarm`] expired.
    fn alarm(&self);
}

pub trait Alarm<'a> {
    fn set_alarm_client(&self, client: &'a dyn AlarmClient);

    /// Current time in ticks.
    fn now(&self) -> u32;

    fn ticks_from_ms(&self, ms: u32) -> u32;

    /// Fire once `dt` ticks after `reference` have passed. Replaces an alarm
    /// that is already armed.
    fn set_alarm(&self, reference: u32, dt: u32);

    /// Cancel the alarm. No callback follows.
    fn disarm(&self);

    fn is_armed(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod test {
    use core::cell::Cell;

    use tock_cells::optional_cell::OptionalCell;

    use super::*;

    /// Alarm that only expires when the test says so, at 32 ticks per
    /// millisecond.
    pub(crate) struct ManualAlarm<'a> {
        now: Cell<u32>,
        deadline: OptionalCell<u32>,
        client: OptionalCell<&'a dyn AlarmClient>,
    }

    impl ManualAlarm<'_> {
        pub(crate) fn new() -> Self {
            ManualAlarm {
                now: Cell::new(0),
                deadline: OptionalCell::empty(),
                client: OptionalCell::empty(),
            }
        }

        pub(crate) fn deadline(&self) -> Option<u32> {
            self.deadline.get()
        }

        /// Move the clock to the deadline and run the client. Returns false
        /// if the alarm was not armed.
        pub(crate) fn fire(&self) -> bool {
            match self.deadline.take() {
                Some(deadline) => {
                    self.now.set(deadline);
                    self.client.map(|client| client.alarm());
                    true
                }
                None => false,
            }
        }
    }

    impl<'a> Alarm<'a> for ManualAlarm<'a> {
        fn set_alarm_client(&self, client: &'a dyn AlarmClient) {
            self.client.set(client);
        }

        fn now(&self) -> u32 {
            self.now.get()
        }

        fn ticks_from_ms(&self, ms: u32) -> u32 {
            ms.wrapping_mul(32)
        }

        fn set_alarm(&self, reference: u32, dt: u32) {
            self.deadline.set(reference.wrapping_add(dt));
        }

        fn disarm(&self) {
            self.deadline.clear();
        }

        fn is_armed(&self) -> bool {
            self.deadline.is_some()
        }
    }
}
