// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing firmware state machines.
//!
//! Each engine owns a [`Ringbuf`] of some `Copy + PartialEq` trace type and
//! records an entry at every interesting transition. Nothing is formatted or
//! emitted; the buffer is meant to be read back with a debugger, or by tests
//! through [`Ringbuf::iter`].
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//!
//! ## Creating a ring buffer
//!
//! ```
//! use ringbuf::{ringbuf_entry, Ringbuf};
//!
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! enum Trace {
//!     None,
//!     Erased(u32),
//! }
//!
//! let mut trace = Ringbuf::<Trace, 16>::new(Trace::None);
//! for _ in 0..2 {
//!     ringbuf_entry!(trace, Trace::Erased(0x4_0000));
//! }
//!
//! // Identical back-to-back entries from the same line are collapsed.
//! let last = trace.iter().last().unwrap();
//! assert_eq!(last.payload, Trace::Erased(0x4_0000));
//! assert_eq!(last.count, 2);
//! ```

#![cfg_attr(not(test), no_std)]

/// Inserts data into a ring buffer.
///
/// `ringbuf_entry!(buf, expr)` records `expr` into `buf`, tagged with the line
/// number of the invocation.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate the payload before borrowing the buffer, so the payload
        // expression may itself read from the owner of the buffer.
        let p = $payload;
        $crate::Ringbuf::entry(&mut $buf, line!() as u16, p);
    }};
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
}

///
/// The structure of a single [`Ringbuf`] entry, carrying a payload of arbitrary
/// type.  When a ring buffer entry is generated with an identical payload to
/// the most recent entry (in terms of both `line` and `payload`), `count` will
/// be incremented rather than generating a new entry.
///
#[derive(Debug, Copy, Clone)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

///
/// A ring buffer of parametrized type and size.
///
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    last: Option<usize>,
    buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, { N }> {
    /// Creates an empty ring buffer whose unused slots hold `init`.
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // If this is the first time this ringbuf has been poked, last will be
        // None. In this specific case we want to make sure we don't add to the
        // count of an existing entry, and also that we deposit the first entry
        // in slot 0. The cheapest thing to do is to treat None as an
        // out-of-range value:
        let last = self.last.unwrap_or(usize::MAX);

        // Check to see if we can reuse the most recent entry. This uses get_mut
        // both to avoid checking an entry on the first insertion (see above),
        // and also to handle the case where last is somehow corrupted to point
        // out-of-range.
        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                // Only reuse this entry if we don't overflow the count.
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // Either we were unable to reuse the entry, or the last index was out
        // of range (perhaps because this is the first insertion). Advance last
        // and wrap if required. wrapping_add turns usize::MAX into 0 for our
        // starting condition.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Iterates over recorded entries, oldest first. Slots that have never
    /// been written are skipped.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last.wrapping_add(1),
            None => N,
        };
        let (newer, older) = self.buffer.split_at(start.min(N));
        older
            .iter()
            .chain(newer.iter())
            .filter(|ent| ent.count != 0)
    }

    /// Returns the most recently recorded payload, if any.
    pub fn last(&self) -> Option<&T> {
        self.last
            .and_then(|ndx| self.buffer.get(ndx))
            .map(|ent| &ent.payload)
    }
}
