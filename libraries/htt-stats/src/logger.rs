// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Circular logs of the HTT messages exchanged with the firmware.
//!
//! There is one log per direction of traffic: commands sent by the host,
//! events sent by the firmware, and WBM (wireless buffer manager) completion
//! messages. Each log keeps the last `N` records. Logging of a message type
//! can be turned off with a per log mask, where a set bit `1 << type`
//! disables that type.
//!
//! Usage
//! -----
//!
//! ```rust
//! use htt_stats::logger::{HttLogger, LogKind};
//!
//! let mut log: HttLogger<64> = HttLogger::new();
//! log.enable_type(LogKind::Command, 0x0b);
//! log.record(LogKind::Command, 0x0b, Some(&[1, 2, 3]), 1000, 0);
//! let newest = log.entries(LogKind::Command).next().unwrap();
//! assert_eq!(newest.data[3], 0xff);
//! ```

use tracing::trace;

/// Bytes of the message kept with each record.
pub const RECORD_DATA_LEN: usize = 16;

/// Default size of each log.
pub const MAX_ENTRY: usize = 1024;

/// Event types logged by default.
pub const EVENT_PEER_MAP: u8 = 0x03;
pub const EVENT_PEER_UNMAP: u8 = 0x04;
pub const EVENT_RX_ADDBA: u8 = 0x05;
pub const EVENT_RX_DELBA: u8 = 0x06;
pub const EVENT_PEER_MAP_V2: u8 = 0x1e;
pub const EVENT_PEER_UNMAP_V2: u8 = 0x1f;

pub const DEFAULT_COMMAND_MASK: u64 = u64::MAX;
pub const DEFAULT_EVENT_MASK: u64 = !((1 << EVENT_PEER_MAP)
    | (1 << EVENT_PEER_UNMAP)
    | (1 << EVENT_RX_ADDBA)
    | (1 << EVENT_RX_DELBA)
    | (1 << EVENT_PEER_MAP_V2)
    | (1 << EVENT_PEER_UNMAP_V2));
pub const DEFAULT_WBM_MASK: u64 = 0x1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogKind {
    Command,
    Event,
    Wbm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub msg_type: u8,
    /// Start of the message. Bytes past the end of a short message are 0xff.
    pub data: [u8; RECORD_DATA_LEN],
    pub time: u64,
    pub cpu_id: u32,
}

impl Record {
    const EMPTY: Record = Record {
        msg_type: 0,
        data: [0xff; RECORD_DATA_LEN],
        time: 0,
        cpu_id: 0,
    };
}

struct Log<const N: usize> {
    records: [Record; N],
    // Next slot to write.
    tail: usize,
    // Records written since the log was created.
    length: usize,
    disable_mask: u64,
}

impl<const N: usize> Log<N> {
    const fn new(disable_mask: u64) -> Log<N> {
        Log {
            records: [Record::EMPTY; N],
            tail: 0,
            length: 0,
            disable_mask,
        }
    }

    fn is_disabled(&self, msg_type: u8) -> bool {
        // Types outside the mask cannot be turned off.
        msg_type < 64 && (1u64 << msg_type) & self.disable_mask != 0
    }

    fn push(&mut self, record: Record) {
        if N == 0 {
            return;
        }
        if self.tail >= N {
            self.tail = 0;
        }
        self.records[self.tail] = record;
        self.tail += 1;
        self.length += 1;
    }
}

/// The three HTT logs and their settings.
pub struct HttLogger<const N: usize = MAX_ENTRY> {
    enabled: bool,
    command: Log<N>,
    event: Log<N>,
    wbm: Log<N>,
}

impl<const N: usize> HttLogger<N> {
    pub const fn new() -> HttLogger<N> {
        HttLogger {
            enabled: true,
            command: Log::new(DEFAULT_COMMAND_MASK),
            event: Log::new(DEFAULT_EVENT_MASK),
            wbm: Log::new(DEFAULT_WBM_MASK),
        }
    }

    fn log(&self, kind: LogKind) -> &Log<N> {
        match kind {
            LogKind::Command => &self.command,
            LogKind::Event => &self.event,
            LogKind::Wbm => &self.wbm,
        }
    }

    fn log_mut(&mut self, kind: LogKind) -> &mut Log<N> {
        match kind {
            LogKind::Command => &mut self.command,
            LogKind::Event => &mut self.event,
            LogKind::Wbm => &mut self.wbm,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn disable_mask(&self, kind: LogKind) -> u64 {
        self.log(kind).disable_mask
    }

    pub fn set_disable_mask(&mut self, kind: LogKind, mask: u64) {
        self.log_mut(kind).disable_mask = mask;
    }

    pub fn enable_type(&mut self, kind: LogKind, msg_type: u8) {
        if msg_type < 64 {
            self.log_mut(kind).disable_mask &= !(1 << msg_type);
        }
    }

    pub fn disable_type(&mut self, kind: LogKind, msg_type: u8) {
        if msg_type < 64 {
            self.log_mut(kind).disable_mask |= 1 << msg_type;
        }
    }

    /// Log a message. `data` is the message body, or `None` if the message
    /// could not be read. Returns whether the message was recorded.
    pub fn record(
        &mut self,
        kind: LogKind,
        msg_type: u8,
        data: Option<&[u8]>,
        time: u64,
        cpu_id: u32,
    ) -> bool {
        if !self.enabled || self.log(kind).is_disabled(msg_type) {
            return false;
        }

        let mut record = Record {
            msg_type,
            data: [0xff; RECORD_DATA_LEN],
            time,
            cpu_id,
        };
        if let Some(data) = data {
            let len = data.len().min(RECORD_DATA_LEN);
            record.data[..len].copy_from_slice(&data[..len]);
        }
        trace!(?kind, msg_type, time, "htt log");
        self.log_mut(kind).push(record);
        true
    }

    /// Records written to a log so far, including the overwritten ones.
    pub fn len(&self, kind: LogKind) -> usize {
        self.log(kind).length
    }

    pub fn is_empty(&self, kind: LogKind) -> bool {
        self.len(kind) == 0
    }

    /// The records of a log, newest first.
    pub fn entries(&self, kind: LogKind) -> Entries<'_, N> {
        let log = self.log(kind);
        Entries {
            log,
            index: log.tail,
            left: log.length.min(N),
        }
    }
}

impl<const N: usize> Default for HttLogger<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a log, from the newest record back.
pub struct Entries<'a, const N: usize> {
    log: &'a Log<N>,
    // Slot after the next record to yield.
    index: usize,
    left: usize,
}

impl<'a, const N: usize> Iterator for Entries<'a, N> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<&'a Record> {
        if self.left == 0 {
            return None;
        }
        self.index = if self.index == 0 { N - 1 } else { self.index - 1 };
        self.left -= 1;
        Some(&self.log.records[self.index])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.left, Some(self.left))
    }
}

impl<const N: usize> ExactSizeIterator for Entries<'_, N> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_masks() {
        let mut log: HttLogger<8> = HttLogger::new();
        assert!(log.is_enabled());
        assert!(!log.record(LogKind::Command, 0x0b, None, 1, 0));
        assert!(!log.record(LogKind::Event, 0x07, None, 1, 0));
        for t in [0x03, 0x04, 0x05, 0x06, 0x1e, 0x1f] {
            assert!(log.record(LogKind::Event, t, None, 1, 0));
        }
        assert!(!log.record(LogKind::Wbm, 0, None, 1, 0));
        assert!(log.record(LogKind::Wbm, 1, None, 1, 0));
        assert_eq!(log.len(LogKind::Event), 6);
        assert!(log.is_empty(LogKind::Command));
    }

    #[test]
    fn data_is_padded() {
        let mut log: HttLogger<4> = HttLogger::new();
        log.set_disable_mask(LogKind::Command, 0);
        log.record(LogKind::Command, 1, Some(&[0xaa; 20]), 5, 2);
        log.record(LogKind::Command, 2, Some(&[1, 2]), 6, 3);
        log.record(LogKind::Command, 3, None, 7, 0);

        let records: [&Record; 3] = {
            let mut it = log.entries(LogKind::Command);
            [it.next().unwrap(), it.next().unwrap(), it.next().unwrap()]
        };
        assert_eq!(records[0].msg_type, 3);
        assert_eq!(records[0].data, [0xff; RECORD_DATA_LEN]);
        assert_eq!(&records[1].data[..3], &[1u8, 2, 0xff]);
        assert_eq!(records[1].cpu_id, 3);
        assert_eq!(records[2].data, [0xaa; RECORD_DATA_LEN]);
        assert_eq!(records[2].time, 5);
    }

    #[test]
    fn wraps_newest_first() {
        let mut log: HttLogger<4> = HttLogger::new();
        log.enable_type(LogKind::Command, 9);
        for time in 0..10 {
            log.record(LogKind::Command, 9, None, time, 0);
        }
        assert_eq!(log.len(LogKind::Command), 10);
        let mut entries = log.entries(LogKind::Command);
        assert_eq!(entries.len(), 4);
        for time in (6..10).rev() {
            assert_eq!(entries.next().map(|r| r.time), Some(time));
        }
        assert!(entries.next().is_none());
    }

    #[test]
    fn global_switch_and_types() {
        let mut log: HttLogger<4> = HttLogger::new();
        log.enable_type(LogKind::Wbm, 0);
        log.set_enabled(false);
        assert!(!log.record(LogKind::Wbm, 0, None, 0, 0));
        log.set_enabled(true);
        assert!(log.record(LogKind::Wbm, 0, None, 0, 0));
        log.disable_type(LogKind::Wbm, 0);
        assert!(!log.record(LogKind::Wbm, 0, None, 0, 0));
        assert_eq!(log.disable_mask(LogKind::Wbm), DEFAULT_WBM_MASK);
        // Types past the mask are always logged.
        assert!(log.record(LogKind::Command, 200, None, 0, 0));
    }
}
