//! SHA-256 and HMAC-SHA256, as consumed by image verification and RMA.
//!
//! The arithmetic lives in the `sha2` crate; this module pins down the small
//! interface the rest of the firmware uses, so a hardware hash block can be
//! slotted in behind it without touching callers.

use hmac::{Hmac, Mac};
use sha2::{Digest as _, Sha256};

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 input block size. HMAC keys longer than this are rejected.
pub const BLOCK_SIZE: usize = 64;

pub type Digest = [u8; DIGEST_SIZE];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HashError {
    /// HMAC key longer than [`BLOCK_SIZE`].
    KeyTooLong,
}

/// An incremental SHA-256 computation.
///
/// `finish` consumes the hasher, so a finished context cannot be fed more data
/// by accident.
#[derive(Clone)]
pub struct Hasher {
    inner: Sha256,
}

impl Hasher {
    pub fn begin() -> Self {
        Self { inner: Sha256::new() }
    }

    /// Adds `data` to the running hash. Chunk boundaries do not affect the
    /// result.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(self) -> Digest {
        self.inner.finalize().into()
    }
}

/// One-shot SHA-256 of `data`.
pub fn hash(data: &[u8]) -> Digest {
    let mut h = Hasher::begin();
    h.update(data);
    h.finish()
}

/// Computes HMAC-SHA256 of `message` under `key`.
///
/// Keys are limited to one block. The HMAC construction would hash a longer
/// key down first, but nothing here needs that, and refusing it keeps callers
/// from passing a whole buffer where a secret was meant.
pub fn hmac(key: &[u8], message: &[u8]) -> Result<Digest, HashError> {
    if key.len() > BLOCK_SIZE {
        return Err(HashError::KeyTooLong);
    }
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| HashError::KeyTooLong)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}
