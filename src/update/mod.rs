//! Firmware update protocol engine.
//!
//! An update session starts with a connection frame, which picks the image
//! copy we are *not* running as the target. Data frames are then written into
//! that region in order. The first frame at the region's base erases the whole
//! region; every write is read back before it is acknowledged. Erase, write
//! and read-back failures end the session, since the target then holds an
//! unknown mix of old and new image, and the host has to start over.
//!
//! An optional touchpad region is a separate address space. Frames addressed
//! there are handed to [`Bsp::touchpad_write`] instead of flash.

pub mod policy;
pub mod receiver;
pub mod wire;

pub use policy::{AllowAll, TouchpadHashPolicy, UpdatePolicy};
pub use receiver::{FrameHandler, RxState, UpdateReceiver};
pub use wire::{ExtraCommand, FirstResponsePdu, UpdateFrameHeader, UpdateStatus};

use crate::bsp::{Bsp, BspError, ImageCopy};
use crate::flash::{FlashError, FlashMedium, FlashRegion};
use num_traits::FromPrimitive;
use receiver::status_response;
use ringbuf::{ringbuf_entry, Ringbuf};
use spin::Mutex;
use wire::{
    HEADER_SIZE, UPDATE_EXTRA_CMD, UPDATE_HEADER_TYPE_COMMON, UPDATE_PROTOCOL_VERSION,
};
use zerocopy::byteorder::{BigEndian, I32, U16, U32};
use zerocopy::{AsBytes, FromBytes};

/// Entropy injected through [`ExtraCommand::InjectEntropy`] must be at least
/// this long.
pub const MIN_ENTROPY_SIZE: usize = 32;

/// Read-back verification compares through a buffer this big.
const VERIFY_CHUNK: usize = 64;

/// Where the two image copies live.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlashLayout {
    pub ro: FlashRegion,
    pub rw: FlashRegion,
    /// Virtual region for touchpad firmware, if the board has one.
    pub touchpad: Option<FlashRegion>,
}

impl FlashLayout {
    pub fn region(&self, copy: ImageCopy) -> FlashRegion {
        match copy {
            ImageCopy::Ro => self.ro,
            ImageCopy::Rw => self.rw,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UpdateConfig {
    /// Largest payload the host may put in one frame.
    pub max_pdu_size: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { max_pdu_size: 1024 }
    }
}

/// Counters kept across sessions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateStats {
    pub sessions: u32,
    pub frames: u32,
    pub bytes_written: u32,
    pub erases: u32,
    pub errors: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum UpdateState {
    NoSession,
    InProgress { target: FlashRegion },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trace {
    None,
    Connected { base: u32, size: u32 },
    NoSession,
    BadAddress { offset: u32, len: u32 },
    TooLarge(u32),
    Rejected(u32),
    TooSoon(u32),
    Erased(u32),
    EraseFailed(FlashError),
    WriteFailed { offset: u32, err: FlashError },
    VerifyFailed(u32),
    Wrote { offset: u32, len: u32 },
    TouchpadWrite { offset: u32, len: u32 },
    TouchpadFailed(u32),
    Extra(u16),
    ExtraFailed(u16),
    Done,
}

pub struct UpdateEngine<'a, F, B, P> {
    flash: &'a Mutex<F>,
    layout: FlashLayout,
    config: UpdateConfig,
    bsp: B,
    policy: P,
    state: UpdateState,
    stats: UpdateStats,
    trace: Ringbuf<Trace, 32>,
}

impl<'a, F, B, P> UpdateEngine<'a, F, B, P>
where
    F: FlashMedium,
    B: Bsp,
    P: UpdatePolicy,
{
    pub fn new(
        flash: &'a Mutex<F>,
        layout: FlashLayout,
        config: UpdateConfig,
        bsp: B,
        policy: P,
    ) -> Self {
        Self {
            flash,
            layout,
            config,
            bsp,
            policy,
            state: UpdateState::NoSession,
            stats: UpdateStats::default(),
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    pub fn bsp(&self) -> &B {
        &self.bsp
    }

    pub fn bsp_mut(&mut self) -> &mut B {
        &mut self.bsp
    }

    /// The region this session writes to, if one is open.
    pub fn target(&self) -> Option<FlashRegion> {
        match self.state {
            UpdateState::NoSession => None,
            UpdateState::InProgress { target } => Some(target),
        }
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 32> {
        &self.trace
    }

    /// Opens a session aimed at the copy we are not running, replacing any
    /// session already open.
    pub fn connect(&mut self) -> FirstResponsePdu {
        let inactive = self.bsp.running_copy().other();
        let target = self.layout.region(inactive);
        let flash_protection = self.flash.lock().protect_flags();

        self.state = UpdateState::InProgress { target };
        self.stats.sessions = self.stats.sessions.wrapping_add(1);
        ringbuf_entry!(
            self.trace,
            Trace::Connected {
                base: target.base,
                size: target.size,
            }
        );

        FirstResponsePdu {
            return_value: U32::new(UpdateStatus::Success as u32),
            header_type: U16::new(UPDATE_HEADER_TYPE_COMMON),
            protocol_version: U16::new(UPDATE_PROTOCOL_VERSION),
            maximum_pdu_size: U32::new(self.config.max_pdu_size),
            flash_protection: U32::new(flash_protection),
            offset: U32::new(target.base),
            version: self.bsp.version(inactive),
            min_rollback: I32::<BigEndian>::new(self.bsp.min_rollback()),
            key_version: U32::new(self.bsp.key_version()),
        }
    }

    /// Writes one data frame's payload at `offset`.
    pub fn write_block(&mut self, offset: u32, payload: &[u8]) -> UpdateStatus {
        self.stats.frames = self.stats.frames.wrapping_add(1);
        let status = self.write_block_inner(offset, payload);
        if status != UpdateStatus::Success {
            self.stats.errors = self.stats.errors.wrapping_add(1);
        }
        if status.is_fatal() {
            self.state = UpdateState::NoSession;
        }
        status
    }

    fn write_block_inner(&mut self, offset: u32, payload: &[u8]) -> UpdateStatus {
        let target = match self.state {
            UpdateState::NoSession => {
                ringbuf_entry!(self.trace, Trace::NoSession);
                return UpdateStatus::GenError;
            }
            UpdateState::InProgress { target } => target,
        };

        let len = payload.len() as u32;
        if payload.len() > self.config.max_pdu_size as usize {
            ringbuf_entry!(self.trace, Trace::TooLarge(len));
            return UpdateStatus::GenError;
        }

        let touchpad = self
            .layout
            .touchpad
            .filter(|r| r.contains_range(offset, payload.len()));
        if touchpad.is_none() && !target.contains_range(offset, payload.len()) {
            ringbuf_entry!(self.trace, Trace::BadAddress { offset, len });
            return UpdateStatus::BadAddr;
        }

        if !self.policy.contents_allowed(offset, payload) {
            ringbuf_entry!(self.trace, Trace::Rejected(offset));
            return UpdateStatus::RollbackError;
        }
        if self.policy.chunk_came_too_soon(offset) {
            ringbuf_entry!(self.trace, Trace::TooSoon(offset));
            return UpdateStatus::RateLimitError;
        }

        if touchpad.is_some() {
            return match self.bsp.touchpad_write(offset, payload) {
                Ok(()) => {
                    ringbuf_entry!(self.trace, Trace::TouchpadWrite { offset, len });
                    UpdateStatus::Success
                }
                Err(_) => {
                    ringbuf_entry!(self.trace, Trace::TouchpadFailed(offset));
                    UpdateStatus::WriteFailure
                }
            };
        }

        // Held across erase, write and read-back so nothing else sees the
        // region half done.
        let mut flash = self.flash.lock();

        if offset == target.base {
            if let Err(e) = flash.erase(target.base, target.size) {
                ringbuf_entry!(self.trace, Trace::EraseFailed(e));
                return UpdateStatus::EraseFailure;
            }
            self.stats.erases = self.stats.erases.wrapping_add(1);
            ringbuf_entry!(self.trace, Trace::Erased(target.base));
        }

        if let Err(err) = flash.write(offset, payload) {
            ringbuf_entry!(self.trace, Trace::WriteFailed { offset, err });
            return UpdateStatus::WriteFailure;
        }

        if !readback_matches(&*flash, offset, payload) {
            ringbuf_entry!(self.trace, Trace::VerifyFailed(offset));
            return UpdateStatus::VerifyError;
        }

        self.stats.bytes_written = self.stats.bytes_written.wrapping_add(len);
        ringbuf_entry!(self.trace, Trace::Wrote { offset, len });
        UpdateStatus::Success
    }

    /// Runs a vendor sub-command. `payload` starts with the big-endian
    /// sub-command number. The reply is a status byte followed by whatever
    /// data the command produced; its length is returned.
    pub fn extra_command(&mut self, payload: &[u8], response: &mut [u8]) -> usize {
        let (code, data) = match payload {
            [hi, lo, data @ ..] => (u16::from_be_bytes([*hi, *lo]), data),
            _ => return status_response(UpdateStatus::DataError, response),
        };
        ringbuf_entry!(self.trace, Trace::Extra(code));

        let Some((status_byte, out)) = response.split_first_mut() else {
            return 0;
        };

        let result = match ExtraCommand::from_u16(code) {
            Some(cmd) => self.run_extra(cmd, data, out),
            None => Err(BspError::Unsupported),
        };
        match result {
            Ok(n) => {
                *status_byte = UpdateStatus::Success as u8;
                1 + n
            }
            Err(e) => {
                ringbuf_entry!(self.trace, Trace::ExtraFailed(code));
                *status_byte = match e {
                    BspError::BadParam => UpdateStatus::DataError,
                    BspError::Unsupported | BspError::Failed => UpdateStatus::GenError,
                } as u8;
                1
            }
        }
    }

    fn run_extra(
        &mut self,
        cmd: ExtraCommand,
        data: &[u8],
        out: &mut [u8],
    ) -> Result<usize, BspError> {
        match cmd {
            ExtraCommand::ImmediateReset => self.bsp.immediate_reset().map(|()| 0),
            ExtraCommand::JumpToRw => self.bsp.jump_to_rw().map(|()| 0),
            ExtraCommand::StayInRo => self.bsp.stay_in_ro().map(|()| 0),
            ExtraCommand::UnlockRw => self.bsp.unlock_rw().map(|()| 0),
            ExtraCommand::UnlockRollback => self.bsp.unlock_rollback().map(|()| 0),
            ExtraCommand::InjectEntropy => {
                if data.len() < MIN_ENTROPY_SIZE {
                    return Err(BspError::BadParam);
                }
                self.bsp.add_entropy(data).map(|()| 0)
            }
            ExtraCommand::PairChallenge => Err(BspError::Unsupported),
            ExtraCommand::TouchpadInfo => self.bsp.touchpad_info(out),
            ExtraCommand::TouchpadDebug => self.bsp.touchpad_debug(data, out),
            ExtraCommand::ConsoleReadInit => self.bsp.console_read_init().map(|()| 0),
            ExtraCommand::ConsoleReadNext => self.bsp.console_read_next(out),
            ExtraCommand::GetVersionString => {
                let version = self.bsp.version(self.bsp.running_copy());
                let dest = out
                    .get_mut(..version.len())
                    .ok_or(BspError::Failed)?;
                dest.copy_from_slice(&version);
                Ok(version.len())
            }
        }
    }
}

impl<F, B, P> FrameHandler for UpdateEngine<'_, F, B, P>
where
    F: FlashMedium,
    B: Bsp,
    P: UpdatePolicy,
{
    fn handle_frame(&mut self, frame: &[u8], response: &mut [u8]) -> usize {
        let Some(header) = UpdateFrameHeader::read_from_prefix(frame) else {
            return status_response(UpdateStatus::GenError, response);
        };
        if header.block_size.get() as usize != frame.len() {
            return status_response(UpdateStatus::DataError, response);
        }
        let payload = &frame[HEADER_SIZE..];
        let base = header.block_base.get();

        if base == UPDATE_EXTRA_CMD {
            return self.extra_command(payload, response);
        }
        if header.is_connection() {
            let pdu = self.connect();
            return match pdu.write_to_prefix(&mut *response) {
                Some(()) => pdu.as_bytes().len(),
                None => status_response(UpdateStatus::GenError, response),
            };
        }
        let status = self.write_block(base, payload);
        status_response(status, response)
    }

    fn end_session(&mut self) {
        ringbuf_entry!(self.trace, Trace::Done);
        self.state = UpdateState::NoSession;
    }
}

fn readback_matches<F: FlashMedium + ?Sized>(flash: &F, offset: u32, expected: &[u8]) -> bool {
    let mut buf = [0u8; VERIFY_CHUNK];
    let mut pos = offset;
    for want in expected.chunks(VERIFY_CHUNK) {
        let got = &mut buf[..want.len()];
        if flash.read(pos, got).is_err() || got != want {
            return false;
        }
        pos = pos.wrapping_add(want.len() as u32);
    }
    true
}
