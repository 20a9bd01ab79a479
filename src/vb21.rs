//! VBoot 2.1 packed key and signature structures.
//!
//! Both live in flash and are only as trustworthy as the flash they came from,
//! so everything here is structural validation over fixed-size copies. All
//! fields are little-endian and packed.

use crate::rsa::RsaPublicKey;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, Unaligned};

/// Magic for [`PackedKey`].
pub const VB21_MAGIC_PACKED_KEY: u32 = 0x5032_6256;
/// Magic for [`PackedSignature`], "V2SG" in memory order.
pub const VB21_MAGIC_SIGNATURE: u32 = 0x4753_3256;

pub const VB21_STRUCT_VERSION_MAJOR: u16 = 3;
pub const VB21_STRUCT_VERSION_MINOR: u16 = 0;

/// Signature algorithm identifiers, as assigned by the signing tools.
pub mod sig_alg {
    pub const RSA2048: u16 = 2;
    pub const RSA4096: u16 = 3;
    pub const RSA2048_EXP3: u16 = 5;
    pub const RSA3072_EXP3: u16 = 6;
    pub const RSA3072: u16 = 7;
}

pub const HASH_ALG_SHA256: u16 = 2;

/// Length of the key/signature identifier, a SHA-1 of the public key.
pub const ID_SIZE: usize = 20;

type Le16 = U16<LittleEndian>;
type Le32 = U32<LittleEndian>;

/// Header shared by all VBoot 2.1 structures.
#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct StructCommon {
    pub magic: Le32,
    pub struct_version_major: Le16,
    pub struct_version_minor: Le16,
    /// Size of the structure and everything it points to.
    pub total_size: Le32,
    /// Size of the fixed portion, i.e. this header plus the type's fields.
    pub fixed_size: Le32,
    /// Size of the description string that follows the fixed portion.
    pub desc_size: Le32,
}

#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct PackedKey {
    pub c: StructCommon,
    /// Offset of the key data from the start of this struct.
    pub key_offset: Le32,
    pub key_size: Le32,
    pub sig_alg: Le16,
    pub hash_alg: Le16,
    pub key_version: Le32,
    pub id: [u8; ID_SIZE],
}

#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct PackedSignature {
    pub c: StructCommon,
    /// Offset of the signature bytes from the start of this struct.
    pub sig_offset: Le32,
    pub sig_size: Le32,
    /// Number of bytes of image covered by the signature.
    pub data_size: Le32,
    pub sig_alg: Le16,
    pub hash_alg: Le16,
    pub id: [u8; ID_SIZE],
}

const_assert_eq!(size_of::<StructCommon>(), 20);
const_assert_eq!(size_of::<PackedKey>(), 56);
const_assert_eq!(size_of::<PackedSignature>(), 56);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyError {
    /// Fewer bytes than a header.
    Truncated,
    BadMagic,
    /// `key_size` is not the size of a packed RSA key of the expected width.
    BadSize,
    /// Key data does not sit inside the key area.
    BadOffset,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SigError {
    Truncated,
    BadMagic,
    /// `sig_size` is not the modulus length.
    BadSize,
    SigAlgMismatch,
    HashAlgMismatch,
    /// Signature bytes overlap the header or run off the signature area.
    BadOffset,
    /// The signed data would run into the signature area.
    BadDataSize,
}

impl PackedKey {
    /// Copies a header out of the front of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, KeyError> {
        Self::read_from_prefix(bytes).ok_or(KeyError::Truncated)
    }
}

impl PackedSignature {
    /// Copies a header out of the front of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, SigError> {
        Self::read_from_prefix(bytes).ok_or(SigError::Truncated)
    }
}

/// Checks a packed key header for a `WORDS`-word RSA key stored in a key area
/// of `area_size` bytes.
pub fn validate_packed_key<const WORDS: usize>(
    key: &PackedKey,
    area_size: u32,
) -> Result<(), KeyError> {
    if key.c.magic.get() != VB21_MAGIC_PACKED_KEY {
        return Err(KeyError::BadMagic);
    }
    if key.key_size.get() as usize != RsaPublicKey::<WORDS>::PACKED_SIZE {
        return Err(KeyError::BadSize);
    }
    let offset = key.key_offset.get();
    if (offset as usize) < size_of::<PackedKey>() {
        return Err(KeyError::BadOffset);
    }
    match offset.checked_add(key.key_size.get()) {
        Some(end) if end <= area_size => Ok(()),
        _ => Err(KeyError::BadOffset),
    }
}

/// Checks a packed signature header against the key that is supposed to
/// verify it.
///
/// `sig_region_size` is the size of the area at the end of the image holding
/// the signature structure; `rw_size` is the size of the whole image slot.
pub fn validate_packed_signature<const WORDS: usize>(
    sig: &PackedSignature,
    key: &PackedKey,
    sig_region_size: u32,
    rw_size: u32,
) -> Result<(), SigError> {
    let rsa_bytes = RsaPublicKey::<WORDS>::BYTES as u32;

    if sig.c.magic.get() != VB21_MAGIC_SIGNATURE {
        return Err(SigError::BadMagic);
    }
    if sig.sig_size.get() != rsa_bytes {
        return Err(SigError::BadSize);
    }
    if sig.sig_alg.get() != key.sig_alg.get() {
        return Err(SigError::SigAlgMismatch);
    }
    if sig.hash_alg.get() != key.hash_alg.get() {
        return Err(SigError::HashAlgMismatch);
    }

    let offset = sig.sig_offset.get();
    if (offset as usize) < size_of::<PackedSignature>() {
        return Err(SigError::BadOffset);
    }
    match offset.checked_add(rsa_bytes) {
        Some(end) if end <= sig_region_size => (),
        _ => return Err(SigError::BadOffset),
    }

    match rw_size.checked_sub(sig_region_size) {
        Some(max) if sig.data_size.get() <= max => Ok(()),
        _ => Err(SigError::BadDataSize),
    }
}
