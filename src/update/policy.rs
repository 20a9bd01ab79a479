//! Board policy hooks consulted before any data frame touches flash.

use crate::flash::FlashRegion;
use crate::sha256::{self, Digest};
use subtle::ConstantTimeEq;

pub trait UpdatePolicy {
    /// Whether `payload` may be written at `offset`. A refusal is reported to
    /// the host as a rollback error.
    fn contents_allowed(&mut self, _offset: u32, _payload: &[u8]) -> bool {
        true
    }

    /// Whether the host should back off before sending the chunk at
    /// `offset`. Reported as a rate limit error.
    fn chunk_came_too_soon(&mut self, _offset: u32) -> bool {
        false
    }
}

/// Accepts everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllowAll;

impl UpdatePolicy for AllowAll {}

impl<P: UpdatePolicy + ?Sized> UpdatePolicy for &mut P {
    fn contents_allowed(&mut self, offset: u32, payload: &[u8]) -> bool {
        (**self).contents_allowed(offset, payload)
    }

    fn chunk_came_too_soon(&mut self, offset: u32) -> bool {
        (**self).chunk_came_too_soon(offset)
    }
}

/// Only lets through touchpad firmware matching a table of SHA-256 hashes
/// built into the EC, one per PDU-sized chunk.
///
/// Chunks must start on a PDU boundary of the touchpad region and be exactly
/// one PDU long. Frames outside the touchpad region are not this policy's
/// business and are allowed.
pub struct TouchpadHashPolicy<'a> {
    region: FlashRegion,
    pdu_size: u32,
    hashes: &'a [Digest],
}

impl<'a> TouchpadHashPolicy<'a> {
    pub fn new(region: FlashRegion, pdu_size: u32, hashes: &'a [Digest]) -> Self {
        Self {
            region,
            pdu_size,
            hashes,
        }
    }

    fn chunk_ok(&self, offset: u32, payload: &[u8]) -> bool {
        if self.pdu_size == 0 || payload.len() != self.pdu_size as usize {
            return false;
        }
        let Some(rel) = self.region.relative(offset) else {
            return false;
        };
        if rel % self.pdu_size != 0 {
            return false;
        }
        let Some(expected) = self.hashes.get((rel / self.pdu_size) as usize) else {
            return false;
        };
        bool::from(sha256::hash(payload).ct_eq(expected))
    }
}

impl UpdatePolicy for TouchpadHashPolicy<'_> {
    fn contents_allowed(&mut self, offset: u32, payload: &[u8]) -> bool {
        if self.region.relative(offset).is_none() {
            return true;
        }
        self.chunk_ok(offset, payload)
    }
}
