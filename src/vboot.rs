//! Verified boot of the RW image slots.
//!
//! Each slot holds an image, `0xFF` padding, and a signature area at its very
//! end. A single RSA key lives in the read-only key area. A slot is bootable
//! only if:
//!
//! - the packed key and packed signature headers are well formed and agree,
//! - everything between the end of the signed data and the signature area is
//!   erased flash,
//! - the signature verifies over the signed data, and
//! - if a rollback floor is configured, the image's rollback version is at
//!   least the floor.
//!
//! [`VbootVerifier::verify_and_select_slot`] applies this to the preferred slot
//! first and falls back to the other one.

use crate::flash::{self, FlashError, FlashMedium, FlashRegion, ERASED_BYTE};
use crate::rsa::RsaPublicKey;
use crate::sha256;
use crate::vb21::{
    validate_packed_key, validate_packed_signature, KeyError, PackedKey,
    PackedSignature, SigError,
};
use crate::SlotId;
use core::mem::size_of;
use ringbuf::{ringbuf_entry, Ringbuf};
use spin::Mutex;

cfg_if::cfg_if! {
    if #[cfg(feature = "rsa-4096")] {
        /// Width of the RW verification key, in 32-bit words.
        pub const RSA_WORDS: usize = 4096 / 32;
    } else if #[cfg(feature = "rsa-3072")] {
        /// Width of the RW verification key, in 32-bit words.
        pub const RSA_WORDS: usize = 3072 / 32;
    } else {
        /// Width of the RW verification key, in 32-bit words.
        pub const RSA_WORDS: usize = 2048 / 32;
    }
}

pub type VbootKey = RsaPublicKey<RSA_WORDS>;

/// Modulus length, and so signature length, in bytes.
pub const RSA_BYTES: usize = RSA_WORDS * 4;

/// Flash reads while hashing and blank-checking go through a buffer this big.
const CHUNK_SIZE: usize = 256;

/// Where things live in flash.
#[derive(Copy, Clone, Debug)]
pub struct VbootLayout {
    /// Read-only area holding the packed key header and key data.
    pub key: FlashRegion,
    pub slot_a: FlashRegion,
    pub slot_b: FlashRegion,
    /// Size of the signature area at the end of each slot.
    pub sig_region_size: u32,
    /// Offset from the start of a slot of the image's little-endian `u32`
    /// rollback version, if images carry one. It must fall inside the signed
    /// data.
    pub rollback_offset: Option<u32>,
}

impl VbootLayout {
    pub fn slot(&self, which: SlotId) -> FlashRegion {
        match which {
            SlotId::A => self.slot_a,
            SlotId::B => self.slot_b,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VbootError {
    InvalidKey(KeyError),
    InvalidSignature(SigError),
    /// The gap between the signed data and the signature area is not erased.
    InvalidPadding,
    /// The signature does not match the data.
    InvalidData,
    /// The image is older than the rollback floor.
    Rollback,
    /// Flash could not be read. Not a statement about the image.
    Flash(FlashError),
}

impl VbootError {
    /// Hardware errors are not verification results; retrying the other slot
    /// on the same part is pointless.
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Flash(_))
    }
}

impl From<FlashError> for VbootError {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

/// Outcome of [`VbootVerifier::verify_and_select_slot`] when nothing is
/// bootable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootFailure {
    /// Both slots were examined and neither verified.
    NoValidSlot {
        preferred: VbootError,
        other: VbootError,
    },
    /// A flash error stopped verification of `slot`.
    Hardware { slot: SlotId, error: FlashError },
}

/// Persistent boot preference and anti-rollback state.
pub trait TrySlotStore {
    /// Slot to try first.
    fn preferred(&self) -> SlotId;

    /// Records `slot` as the slot to try first on the next boot.
    fn set_preferred(&mut self, slot: SlotId) -> Result<(), FlashError>;

    /// Lowest image rollback version that may boot.
    fn min_rollback(&self) -> u32 {
        0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    Verifying(SlotId),
    KeyRejected(KeyError),
    SignatureRejected(SlotId, SigError),
    PaddingNotErased(SlotId),
    SignatureMismatch(SlotId),
    RollbackRejected { slot: SlotId, version: u32, floor: u32 },
    FlashFault(SlotId, FlashError),
    Verified(SlotId),
    FallingBack(SlotId),
    PreferenceSaveFailed(FlashError),
}

pub struct VbootVerifier {
    layout: VbootLayout,
    min_rollback: u32,
    trace: Ringbuf<Trace, 16>,
}

impl VbootVerifier {
    pub fn new(layout: VbootLayout) -> Self {
        Self {
            layout,
            min_rollback: 0,
            trace: Ringbuf::new(Trace::None),
        }
    }

    /// Sets the rollback floor applied by [`Self::verify_slot`]. Only has an
    /// effect if the layout names a rollback version location.
    pub fn set_min_rollback(&mut self, floor: u32) {
        self.min_rollback = floor;
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 16> {
        &self.trace
    }

    /// Checks whether `which` holds a bootable image.
    ///
    /// The flash lock is held for the whole check, so the image cannot change
    /// between hashing and the padding scan.
    pub fn verify_slot<F: FlashMedium>(
        &mut self,
        flash: &Mutex<F>,
        which: SlotId,
    ) -> Result<(), VbootError> {
        ringbuf_entry!(self.trace, Trace::Verifying(which));
        let flash = flash.lock();
        let result = self.check(&*flash, which);
        let entry = match result {
            Ok(()) => Trace::Verified(which),
            Err(VbootError::InvalidKey(e)) => Trace::KeyRejected(e),
            Err(VbootError::InvalidSignature(e)) => Trace::SignatureRejected(which, e),
            Err(VbootError::InvalidPadding) => Trace::PaddingNotErased(which),
            Err(VbootError::InvalidData) => Trace::SignatureMismatch(which),
            // Recorded with its details where it was detected.
            Err(VbootError::Rollback) => return result,
            Err(VbootError::Flash(e)) => Trace::FlashFault(which, e),
        };
        ringbuf_entry!(self.trace, entry);
        result
    }

    /// Picks the slot to boot.
    ///
    /// The store's preferred slot is tried first. If it fails verification the
    /// other slot is tried, and if that one passes it becomes the preferred
    /// slot. A flash error ends the search immediately.
    pub fn verify_and_select_slot<F: FlashMedium, S: TrySlotStore>(
        &mut self,
        flash: &Mutex<F>,
        store: &mut S,
    ) -> Result<SlotId, BootFailure> {
        self.min_rollback = store.min_rollback();

        let preferred = store.preferred();
        let first = match self.verify_slot(flash, preferred) {
            Ok(()) => return Ok(preferred),
            Err(VbootError::Flash(error)) => {
                return Err(BootFailure::Hardware { slot: preferred, error });
            }
            Err(e) => e,
        };

        let other = preferred.other();
        ringbuf_entry!(self.trace, Trace::FallingBack(other));
        match self.verify_slot(flash, other) {
            Ok(()) => {
                if let Err(e) = store.set_preferred(other) {
                    // Still bootable; we'll just do this again next time.
                    ringbuf_entry!(self.trace, Trace::PreferenceSaveFailed(e));
                }
                Ok(other)
            }
            Err(VbootError::Flash(error)) => {
                Err(BootFailure::Hardware { slot: other, error })
            }
            Err(e) => Err(BootFailure::NoValidSlot {
                preferred: first,
                other: e,
            }),
        }
    }

    fn check<F: FlashMedium>(
        &mut self,
        flash: &F,
        which: SlotId,
    ) -> Result<(), VbootError> {
        let layout = self.layout;
        let slot = layout.slot(which);

        // Key header and key.
        let mut hdr = [0; size_of::<PackedKey>()];
        flash.read(layout.key.base, &mut hdr)?;
        let packed_key = PackedKey::parse(&hdr).map_err(VbootError::InvalidKey)?;
        validate_packed_key::<RSA_WORDS>(&packed_key, layout.key.size)
            .map_err(VbootError::InvalidKey)?;

        let mut key_buf = [0; VbootKey::PACKED_SIZE];
        flash.read(layout.key.base + packed_key.key_offset.get(), &mut key_buf)?;
        let key = VbootKey::from_packed(&key_buf)
            .ok_or(VbootError::InvalidKey(KeyError::BadSize))?;

        // Signature header.
        let sig_base = slot
            .size
            .checked_sub(layout.sig_region_size)
            .map(|rel| slot.base + rel)
            .ok_or(VbootError::InvalidSignature(SigError::BadDataSize))?;
        let mut hdr = [0; size_of::<PackedSignature>()];
        flash.read(sig_base, &mut hdr)?;
        let sig = PackedSignature::parse(&hdr).map_err(VbootError::InvalidSignature)?;
        validate_packed_signature::<RSA_WORDS>(
            &sig,
            &packed_key,
            layout.sig_region_size,
            slot.size,
        )
        .map_err(VbootError::InvalidSignature)?;

        let data_size = sig.data_size.get();
        let data_end = slot.base + data_size;

        // Nothing may hide between the signed data and the signature.
        let mut chunk = [0; CHUNK_SIZE];
        let mut dirty = false;
        flash::for_each_chunk(flash, data_end, sig_base - data_end, &mut chunk, |b| {
            dirty |= b.iter().any(|&x| x != ERASED_BYTE);
        })?;
        if dirty {
            return Err(VbootError::InvalidPadding);
        }

        let mut hasher = sha256::Hasher::begin();
        flash::for_each_chunk(flash, slot.base, data_size, &mut chunk, |b| {
            hasher.update(b)
        })?;
        let digest = hasher.finish();

        let mut signature = [0; RSA_BYTES];
        flash.read(sig_base + sig.sig_offset.get(), &mut signature)?;
        if !key.verify(&signature, &digest) {
            return Err(VbootError::InvalidData);
        }

        // The version is only meaningful once we know the data is authentic.
        if let Some(offset) = layout.rollback_offset {
            let covered = offset
                .checked_add(4)
                .map_or(false, |end| end <= data_size);
            let version = if covered {
                let mut raw = [0; 4];
                flash.read(slot.base + offset, &mut raw)?;
                u32::from_le_bytes(raw)
            } else {
                0
            };
            if !covered || version < self.min_rollback {
                ringbuf_entry!(
                    self.trace,
                    Trace::RollbackRejected {
                        slot: which,
                        version,
                        floor: self.min_rollback,
                    }
                );
                return Err(VbootError::Rollback);
            }
        }

        Ok(())
    }
}

#[cfg(all(test, not(any(feature = "rsa-3072", feature = "rsa-4096"))))]
mod tests {
    use super::*;
    use crate::fixtures::{self, Fixture, RSA2048_E3, RSA2048_F4};
    use crate::flash::mem::MemFlash;
    use crate::rsa::{Exponent, EXPONENT};
    use crate::vb21::{build, sig_alg};
    use zerocopy::AsBytes;

    const LAYOUT: VbootLayout = VbootLayout {
        key: FlashRegion::new(0, 0x1000),
        slot_a: FlashRegion::new(0x1000, 0x2000),
        slot_b: FlashRegion::new(0x3000, 0x2000),
        sig_region_size: 0x400,
        rollback_offset: None,
    };

    fn fixture() -> &'static Fixture<256> {
        match EXPONENT {
            Exponent::F4 => &RSA2048_F4,
            Exponent::Three => &RSA2048_E3,
        }
    }

    fn install_key(flash: &mut MemFlash) {
        let hdr = build::packed_key::<64>(sig_alg::RSA2048);
        flash.load(LAYOUT.key.base, hdr.as_bytes());
        let mut blob = [0; VbootKey::PACKED_SIZE];
        fixtures::key::<64, 256>(fixture()).write_packed(&mut blob).unwrap();
        flash.load(LAYOUT.key.base + hdr.key_offset.get(), &blob);
    }

    fn install_image(flash: &mut MemFlash, which: SlotId) {
        let slot = LAYOUT.slot(which);
        flash.load(slot.base, &fixtures::signed_payload());
        let sig_base = slot.base + slot.size - LAYOUT.sig_region_size;
        let sig = build::packed_signature::<64>(
            sig_alg::RSA2048,
            fixtures::SIGNED_LEN as u32,
        );
        flash.load(sig_base, sig.as_bytes());
        flash.load(sig_base + sig.sig_offset.get(), &fixture().sig);
    }

    fn good_flash() -> MemFlash {
        let mut flash = MemFlash::new(0x5000);
        install_key(&mut flash);
        install_image(&mut flash, SlotId::A);
        install_image(&mut flash, SlotId::B);
        flash
    }

    struct Store {
        preferred: SlotId,
        floor: u32,
        saved: Vec<SlotId>,
    }

    impl Store {
        fn new(preferred: SlotId) -> Self {
            Self { preferred, floor: 0, saved: Vec::new() }
        }
    }

    impl TrySlotStore for Store {
        fn preferred(&self) -> SlotId {
            self.preferred
        }
        fn set_preferred(&mut self, slot: SlotId) -> Result<(), FlashError> {
            self.saved.push(slot);
            self.preferred = slot;
            Ok(())
        }
        fn min_rollback(&self) -> u32 {
            self.floor
        }
    }

    fn verify(flash: MemFlash, which: SlotId) -> Result<(), VbootError> {
        VbootVerifier::new(LAYOUT).verify_slot(&Mutex::new(flash), which)
    }

    #[test]
    fn good_slots_verify() {
        let flash = Mutex::new(good_flash());
        let mut v = VbootVerifier::new(LAYOUT);
        assert_eq!(v.verify_slot(&flash, SlotId::A), Ok(()));
        assert_eq!(v.verify_slot(&flash, SlotId::B), Ok(()));
        assert_eq!(v.trace().last(), Some(&Trace::Verified(SlotId::B)));
    }

    #[test]
    fn bad_key_magic() {
        let mut flash = good_flash();
        flash.data[0] ^= 1;
        assert_eq!(
            verify(flash, SlotId::A),
            Err(VbootError::InvalidKey(KeyError::BadMagic))
        );
    }

    #[test]
    fn bad_signature_header() {
        let mut flash = good_flash();
        let sig_base = (0x1000 + 0x2000 - 0x400) as usize;
        // Second byte of sig_size, taking it from 256 to 0.
        flash.data[sig_base + 25] = 0;
        assert_eq!(
            verify(flash, SlotId::A),
            Err(VbootError::InvalidSignature(SigError::BadSize))
        );
    }

    #[test]
    fn dirty_padding() {
        let mut flash = good_flash();
        flash.data[0x1000 + fixtures::SIGNED_LEN + 100] = 0x00;
        assert_eq!(verify(flash, SlotId::A), Err(VbootError::InvalidPadding));
    }

    #[test]
    fn modified_data() {
        let mut flash = good_flash();
        flash.data[0x1000 + 17] ^= 0x40;
        assert_eq!(verify(flash, SlotId::A), Err(VbootError::InvalidData));
    }

    #[test]
    fn modified_signature() {
        let mut flash = good_flash();
        flash.data[0x3000 + 0x2000 - 0x400 + 56 + 9] ^= 0x02;
        assert_eq!(verify(flash, SlotId::B), Err(VbootError::InvalidData));
    }

    #[test]
    fn preferred_slot_wins() {
        let flash = Mutex::new(good_flash());
        let mut store = Store::new(SlotId::B);
        let mut v = VbootVerifier::new(LAYOUT);
        assert_eq!(v.verify_and_select_slot(&flash, &mut store), Ok(SlotId::B));
        assert!(store.saved.is_empty());
    }

    #[test]
    fn falls_back_and_remembers() {
        let mut flash = good_flash();
        flash.data[0x1000] ^= 0xff;
        let flash = Mutex::new(flash);
        let mut store = Store::new(SlotId::A);
        let mut v = VbootVerifier::new(LAYOUT);
        assert_eq!(v.verify_and_select_slot(&flash, &mut store), Ok(SlotId::B));
        assert_eq!(store.saved, [SlotId::B]);
        assert!(v
            .trace()
            .iter()
            .any(|e| e.payload == Trace::FallingBack(SlotId::B)));
    }

    #[test]
    fn both_invalid() {
        let mut flash = good_flash();
        flash.data[0x1000] ^= 0xff;
        flash.data[0x3000 + fixtures::SIGNED_LEN] = 0;
        let flash = Mutex::new(flash);
        let mut store = Store::new(SlotId::A);
        let mut v = VbootVerifier::new(LAYOUT);
        assert_eq!(
            v.verify_and_select_slot(&flash, &mut store),
            Err(BootFailure::NoValidSlot {
                preferred: VbootError::InvalidData,
                other: VbootError::InvalidPadding,
            })
        );
        assert!(store.saved.is_empty());
    }

    #[test]
    fn flash_error_short_circuits() {
        let mut flash = good_flash();
        flash.fail_read = true;
        let flash = Mutex::new(flash);
        let mut store = Store::new(SlotId::A);
        let mut v = VbootVerifier::new(LAYOUT);
        assert_eq!(
            v.verify_and_select_slot(&flash, &mut store),
            Err(BootFailure::Hardware {
                slot: SlotId::A,
                error: FlashError::Read,
            })
        );
        assert!(!v
            .trace()
            .iter()
            .any(|e| e.payload == Trace::Verifying(SlotId::B)));
    }

    #[test]
    fn rollback_floor() {
        let layout = VbootLayout {
            rollback_offset: Some(0x10),
            ..LAYOUT
        };
        let version = u32::from_le_bytes(
            fixtures::signed_payload()[0x10..0x14].try_into().unwrap(),
        );

        let flash = Mutex::new(good_flash());
        let mut v = VbootVerifier::new(layout);
        v.set_min_rollback(version);
        assert_eq!(v.verify_slot(&flash, SlotId::A), Ok(()));
        v.set_min_rollback(version + 1);
        assert_eq!(v.verify_slot(&flash, SlotId::A), Err(VbootError::Rollback));

        // A rollback failure is a verification failure, so B is still tried.
        let mut store = Store::new(SlotId::A);
        store.floor = version + 1;
        assert!(matches!(
            v.verify_and_select_slot(&flash, &mut store),
            Err(BootFailure::NoValidSlot {
                preferred: VbootError::Rollback,
                other: VbootError::Rollback,
            })
        ));
    }

    #[test]
    fn rollback_version_outside_signed_data() {
        let layout = VbootLayout {
            rollback_offset: Some(fixtures::SIGNED_LEN as u32 - 2),
            ..LAYOUT
        };
        let flash = Mutex::new(good_flash());
        let mut v = VbootVerifier::new(layout);
        assert_eq!(v.verify_slot(&flash, SlotId::A), Err(VbootError::Rollback));
    }
}
