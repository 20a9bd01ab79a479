// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types and hooks for implementing Board Support Packages (BSPs).
//!
//! The update engine doesn't care much about the board. The exact properties
//! that need to be described are in the `Bsp` trait below: which image copy is
//! running, what versions are installed, and how to carry out the vendor
//! sub-commands that update tools send. Everything beyond the first two has a
//! default that reports the feature as unsupported, so a minimal board only
//! needs `running_copy` and `version`.

use crate::update::wire::VERSION_STRING_SIZE;

/// The two copies of firmware on an EC.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageCopy {
    Ro,
    Rw,
}

impl ImageCopy {
    pub fn other(self) -> Self {
        match self {
            Self::Ro => Self::Rw,
            Self::Rw => Self::Ro,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspError {
    /// The board doesn't implement this.
    Unsupported,
    /// The request's parameters were malformed.
    BadParam,
    /// The board tried and failed.
    Failed,
}

/// Requirements placed upon a BSP type.
pub trait Bsp {
    /// Which copy we are executing from. Updates always target the other one.
    fn running_copy(&self) -> ImageCopy;

    /// Version string of `copy`, NUL padded.
    fn version(&self, copy: ImageCopy) -> [u8; VERSION_STRING_SIZE];

    /// Minimum rollback version, or -1 if the board has no rollback
    /// protection.
    fn min_rollback(&self) -> i32 {
        -1
    }

    /// Version of the key RW images must be signed with.
    fn key_version(&self) -> u32 {
        0
    }

    /// Writes a chunk of touchpad firmware. The touchpad region is not part of
    /// EC flash, so there is no erase and no read-back.
    fn touchpad_write(&mut self, _offset: u32, _data: &[u8]) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Requests a hard reset once the response has been sent.
    fn immediate_reset(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Lets RO jump to a verified RW without waiting for its timeout.
    fn jump_to_rw(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Keeps RO from jumping to RW on its own.
    fn stay_in_ro(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Clears RW write protection at next boot.
    fn unlock_rw(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Clears rollback region protection at next boot.
    fn unlock_rollback(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Mixes `entropy` into the rollback secret.
    fn add_entropy(&mut self, _entropy: &[u8]) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Fills `out` with touchpad identification, returning its length.
    fn touchpad_info(&mut self, _out: &mut [u8]) -> Result<usize, BspError> {
        Err(BspError::Unsupported)
    }

    /// Passes `param` to the touchpad debug interface, returning the length of
    /// the reply placed in `out`.
    fn touchpad_debug(&mut self, _param: &[u8], _out: &mut [u8]) -> Result<usize, BspError> {
        Err(BspError::Unsupported)
    }

    /// Snapshots the console log for reading with `console_read_next`.
    fn console_read_init(&mut self) -> Result<(), BspError> {
        Err(BspError::Unsupported)
    }

    /// Copies the next piece of the console snapshot into `out`, returning its
    /// length. Zero means the snapshot has been read out.
    fn console_read_next(&mut self, _out: &mut [u8]) -> Result<usize, BspError> {
        Err(BspError::Unsupported)
    }
}
