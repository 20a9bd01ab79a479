//! Reassembly of update frames from transport packets.
//!
//! The transport (USB bulk endpoint, I2C, ...) delivers packets much smaller
//! than a frame. The receiver collects them into whole frames and hands each
//! complete frame to a [`FrameHandler`], normally the
//! [`UpdateEngine`](super::UpdateEngine).
//!
//! ```text
//!            connection frame           header packet
//!   Idle ----------------------> OutsideBlock ------> InsideBlock
//!    ^                            |    ^                  |
//!    +------- UPDATE_DONE --------+    +- block complete -+
//! ```

use super::wire::{UpdateFrameHeader, UpdateStatus, HEADER_SIZE, UPDATE_DONE};
use ringbuf::{ringbuf_entry, Ringbuf};
use zerocopy::FromBytes;

/// Consumer of reassembled frames.
pub trait FrameHandler {
    /// Processes one complete frame, writing the reply into `response` and
    /// returning its length.
    fn handle_frame(&mut self, frame: &[u8], response: &mut [u8]) -> usize;

    /// The host is done with the session.
    fn end_session(&mut self);
}

impl<H: FrameHandler + ?Sized> FrameHandler for &mut H {
    fn handle_frame(&mut self, frame: &[u8], response: &mut [u8]) -> usize {
        (**self).handle_frame(frame, response)
    }

    fn end_session(&mut self) {
        (**self).end_session()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RxState {
    /// Waiting for a connection frame.
    Idle,
    /// Between frames.
    OutsideBlock,
    /// Part of a frame has arrived.
    InsideBlock,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trace {
    None,
    Connected,
    NotConnection,
    Done,
    BadBlockSize(u32),
    Overrun { expected: usize, got: usize },
    BlockStarted(usize),
    BlockComplete(usize),
}

/// Writes a bare status byte reply.
pub(crate) fn status_response(status: UpdateStatus, response: &mut [u8]) -> usize {
    match response.first_mut() {
        Some(b) => {
            *b = status as u8;
            1
        }
        None => 0,
    }
}

/// Frame reassembly buffer for frames of up to `N` bytes, header included.
pub struct UpdateReceiver<const N: usize> {
    state: RxState,
    block: [u8; N],
    received: usize,
    expected: usize,
    trace: Ringbuf<Trace, 16>,
}

impl<const N: usize> Default for UpdateReceiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> UpdateReceiver<N> {
    /// Largest payload a frame may carry.
    pub const MAX_PAYLOAD: usize = N - HEADER_SIZE;

    pub const fn new() -> Self {
        Self {
            state: RxState::Idle,
            block: [0; N],
            received: 0,
            expected: 0,
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 16> {
        &self.trace
    }

    /// Feeds one transport packet in. Returns the length of the reply written
    /// to `response`, which is zero while a frame is still incomplete.
    pub fn receive<H: FrameHandler>(
        &mut self,
        handler: &mut H,
        packet: &[u8],
        response: &mut [u8],
    ) -> usize {
        match self.state {
            RxState::Idle => {
                let connection = packet.len() == HEADER_SIZE
                    && UpdateFrameHeader::read_from(packet)
                        .map_or(false, |h| h.is_connection());
                if !connection {
                    ringbuf_entry!(self.trace, Trace::NotConnection);
                    return status_response(UpdateStatus::GenError, response);
                }
                ringbuf_entry!(self.trace, Trace::Connected);
                self.state = RxState::OutsideBlock;
                handler.handle_frame(packet, response)
            }
            RxState::OutsideBlock => {
                if let Ok(word) = <[u8; 4]>::try_from(packet) {
                    if u32::from_be_bytes(word) == UPDATE_DONE {
                        ringbuf_entry!(self.trace, Trace::Done);
                        handler.end_session();
                        self.state = RxState::Idle;
                        return status_response(UpdateStatus::Success, response);
                    }
                }
                self.start_block(handler, packet, response)
            }
            RxState::InsideBlock => self.continue_block(handler, packet, response),
        }
    }

    fn start_block<H: FrameHandler>(
        &mut self,
        handler: &mut H,
        packet: &[u8],
        response: &mut [u8],
    ) -> usize {
        let Some(header) = UpdateFrameHeader::read_from_prefix(packet) else {
            ringbuf_entry!(self.trace, Trace::BadBlockSize(packet.len() as u32));
            return status_response(UpdateStatus::GenError, response);
        };
        let size = header.block_size.get();
        let expected = size as usize;
        if expected < HEADER_SIZE
            || expected - HEADER_SIZE > Self::MAX_PAYLOAD
            || packet.len() > expected
        {
            ringbuf_entry!(self.trace, Trace::BadBlockSize(size));
            return status_response(UpdateStatus::GenError, response);
        }

        if packet.len() == expected {
            ringbuf_entry!(self.trace, Trace::BlockComplete(expected));
            return handler.handle_frame(packet, response);
        }

        ringbuf_entry!(self.trace, Trace::BlockStarted(expected));
        self.block[..packet.len()].copy_from_slice(packet);
        self.received = packet.len();
        self.expected = expected;
        self.state = RxState::InsideBlock;
        0
    }

    fn continue_block<H: FrameHandler>(
        &mut self,
        handler: &mut H,
        packet: &[u8],
        response: &mut [u8],
    ) -> usize {
        let total = self.received + packet.len();
        if total > self.expected {
            ringbuf_entry!(
                self.trace,
                Trace::Overrun {
                    expected: self.expected,
                    got: total,
                }
            );
            self.state = RxState::OutsideBlock;
            self.received = 0;
            return status_response(UpdateStatus::GenError, response);
        }

        self.block[self.received..total].copy_from_slice(packet);
        self.received = total;
        if total < self.expected {
            return 0;
        }

        ringbuf_entry!(self.trace, Trace::BlockComplete(total));
        self.state = RxState::OutsideBlock;
        self.received = 0;
        handler.handle_frame(&self.block[..total], response)
    }
}
