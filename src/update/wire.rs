// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-the-wire structures of the firmware update protocol.
//!
//! Everything is big-endian. A frame is an [`UpdateFrameHeader`] followed by
//! `block_size - HEADER_SIZE` bytes of payload.

use core::mem::size_of;
use num_derive::{FromPrimitive, ToPrimitive};
use static_assertions::const_assert_eq;
use zerocopy::byteorder::{BigEndian, I32, U16, U32};
use zerocopy::{AsBytes, FromBytes, Unaligned};

pub const UPDATE_PROTOCOL_VERSION: u16 = 6;

/// `header_type` of a [`FirstResponsePdu`] carrying the common response.
pub const UPDATE_HEADER_TYPE_COMMON: u16 = 1;

/// `block_base` of frames carrying a vendor sub-command instead of data.
pub const UPDATE_EXTRA_CMD: u32 = 0xB007_AB1F;

/// Sent on its own, outside any block, to end an update session.
pub const UPDATE_DONE: u32 = 0xB007_AB1E;

pub const VERSION_STRING_SIZE: usize = 32;

pub const HEADER_SIZE: usize = size_of::<UpdateFrameHeader>();

type Be16 = U16<BigEndian>;
type Be32 = U32<BigEndian>;

#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct UpdateFrameHeader {
    /// Length of the whole frame, header included.
    pub block_size: Be32,
    /// Always zero in practice; kept for wire compatibility.
    pub block_digest: Be32,
    /// Destination flash offset, or [`UPDATE_EXTRA_CMD`].
    pub block_base: Be32,
}

impl UpdateFrameHeader {
    pub fn new(block_size: u32, block_base: u32) -> Self {
        Self {
            block_size: Be32::new(block_size),
            block_digest: Be32::ZERO,
            block_base: Be32::new(block_base),
        }
    }

    /// A frame with no payload at offset zero opens a session.
    pub fn is_connection(&self) -> bool {
        self.block_base.get() == 0 && self.block_size.get() as usize == HEADER_SIZE
    }
}

/// Response to the connection frame.
#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct FirstResponsePdu {
    /// An [`UpdateStatus`], widened.
    pub return_value: Be32,
    pub header_type: Be16,
    pub protocol_version: Be16,
    pub maximum_pdu_size: Be32,
    pub flash_protection: Be32,
    /// Flash offset the update should start at.
    pub offset: Be32,
    /// Version string of the copy about to be replaced.
    pub version: [u8; VERSION_STRING_SIZE],
    pub min_rollback: I32<BigEndian>,
    pub key_version: Be32,
}

const_assert_eq!(HEADER_SIZE, 12);
const_assert_eq!(size_of::<FirstResponsePdu>(), 60);

/// Per-frame status byte.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive, ToPrimitive)]
pub enum UpdateStatus {
    Success = 0,
    BadAddr = 1,
    EraseFailure = 2,
    DataError = 3,
    WriteFailure = 4,
    VerifyError = 5,
    GenError = 6,
    MallocError = 7,
    RollbackError = 8,
    RateLimitError = 9,
}

impl UpdateStatus {
    /// Failures after which the target region holds an unknown mix of old and
    /// new data, so the session cannot continue.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::EraseFailure | Self::WriteFailure | Self::VerifyError
        )
    }
}

/// Vendor sub-commands, sent as a big-endian `u16` at the start of the payload
/// of an [`UPDATE_EXTRA_CMD`] frame.
#[repr(u16)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive, ToPrimitive)]
pub enum ExtraCommand {
    ImmediateReset = 0,
    JumpToRw = 1,
    StayInRo = 2,
    UnlockRw = 3,
    UnlockRollback = 4,
    InjectEntropy = 5,
    PairChallenge = 6,
    TouchpadInfo = 7,
    TouchpadDebug = 8,
    ConsoleReadInit = 9,
    ConsoleReadNext = 10,
    GetVersionString = 11,
}
