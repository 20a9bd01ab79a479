//! Firmware update and verified boot for embedded controllers.
//!
//! The pieces, bottom up:
//!
//! - [`flash`]: the storage the images live in, as seen by everything else.
//! - [`sha256`], [`rsa`]: hashing and PKCS#1 v1.5 signature checks.
//! - [`vb21`]: the packed key and signature headers stored next to images.
//! - [`vboot`]: decides which RW slot, if any, is fit to boot.
//! - [`update`]: receives new images from a host and writes them to the copy
//!   we are not running from.
//! - [`rma`]: challenge/response authorization for factory reset.
//! - [`ec_ec`]: host commands to a peer EC over a serial link.
//! - [`bsp`]: what a board has to tell us about itself.

#![cfg_attr(not(test), no_std)]

pub mod base32;
pub mod bsp;
pub mod ec_ec;
pub mod flash;
pub mod rma;
pub mod rsa;
pub mod sha256;
pub mod update;
pub mod vb21;
pub mod vboot;

#[cfg(test)]
mod fixtures;

pub use bsp::{Bsp, ImageCopy};
pub use flash::{FlashError, FlashMedium, FlashRegion};
pub use rma::RmaEngine;
pub use update::{UpdateEngine, UpdateReceiver};
pub use vboot::VbootVerifier;

/// One of the two RW image slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}
