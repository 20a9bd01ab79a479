//! RSA PKCS#1 v1.5 / SHA-256 signature verification.
//!
//! Only the public-key half is here. Exponentiation is done entirely with
//! Montgomery multiplication, using the `n0inv` and `R^2 mod n` values that the
//! signing tools precompute and pack next to the modulus. That keeps long
//! division by a modulus read from flash out of the boot path.
//!
//! Numbers are arrays of little-endian 32-bit words (least significant word
//! first). Signatures and encoded messages are big-endian byte strings.

use crate::sha256::{Digest, DIGEST_SIZE};
use hex_literal::hex;
use subtle::{Choice, ConstantTimeEq};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, LayoutVerified};

/// DER encoding of the SHA-256 `DigestInfo` prefix, which sits between the
/// padding and the digest.
const SHA256_DIGEST_INFO: [u8; 19] =
    hex!("3031300d060960864801650304020105000420");

/// Smallest padding string PKCS#1 allows.
const MIN_PAD_LEN: usize = 8;

/// Public exponents we know how to apply.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Exponent {
    /// 65537
    F4,
    Three,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rsa-exponent-3")] {
        /// Exponent used by [`RsaPublicKey::verify`] in this build.
        pub const EXPONENT: Exponent = Exponent::Three;
    } else {
        /// Exponent used by [`RsaPublicKey::verify`] in this build.
        pub const EXPONENT: Exponent = Exponent::F4;
    }
}

/// An RSA public key of `WORDS` 32-bit words, with its Montgomery constants.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RsaPublicKey<const WORDS: usize> {
    /// `-1 / n[0] mod 2^32`
    pub n0inv: u32,
    /// Modulus.
    pub n: [u32; WORDS],
    /// `R^2 mod n`, where `R = 2^(32 * WORDS)`.
    pub rr: [u32; WORDS],
}

impl<const WORDS: usize> RsaPublicKey<WORDS> {
    /// Modulus (and signature) length in bytes.
    pub const BYTES: usize = WORDS * 4;

    /// Length of the packed form: word count, `n0inv`, `n`, `rr`.
    pub const PACKED_SIZE: usize = 8 + 8 * WORDS;

    /// Parses the packed little-endian key layout. Returns `None` if `bytes`
    /// is the wrong length or describes a key of a different size.
    pub fn from_packed(bytes: &[u8]) -> Option<Self> {
        let words =
            LayoutVerified::<_, [U32<LittleEndian>]>::new_slice_unaligned(bytes)?
                .into_slice();
        if words.len() != 2 + 2 * WORDS || words[0].get() as usize != WORDS {
            return None;
        }

        let mut key = Self {
            n0inv: words[1].get(),
            n: [0; WORDS],
            rr: [0; WORDS],
        };
        let (n, rr) = words[2..].split_at(WORDS);
        for (dest, src) in key.n.iter_mut().zip(n) {
            *dest = src.get();
        }
        for (dest, src) in key.rr.iter_mut().zip(rr) {
            *dest = src.get();
        }
        Some(key)
    }

    /// Writes the packed form of this key to the front of `out`. Returns
    /// `None` if `out` is shorter than [`Self::PACKED_SIZE`].
    pub fn write_packed(&self, out: &mut [u8]) -> Option<()> {
        let out = out.get_mut(..Self::PACKED_SIZE)?;
        let (header, rest) = out.split_at_mut(8);
        U32::<LittleEndian>::new(WORDS as u32).write_to(&mut header[..4])?;
        U32::<LittleEndian>::new(self.n0inv).write_to(&mut header[4..])?;
        for (dest, &w) in rest.chunks_exact_mut(4).zip(self.n.iter().chain(&self.rr)) {
            dest.copy_from_slice(U32::<LittleEndian>::new(w).as_bytes());
        }
        Some(())
    }

    /// Checks that `signature` is a valid PKCS#1 v1.5 signature by this key
    /// over a message hashing to `digest`, using this build's [`EXPONENT`].
    pub fn verify(&self, signature: &[u8], digest: &Digest) -> bool {
        self.verify_with(EXPONENT, signature, digest)
    }

    /// As [`Self::verify`], with an explicit exponent.
    pub fn verify_with(
        &self,
        exponent: Exponent,
        signature: &[u8],
        digest: &Digest,
    ) -> bool {
        if signature.len() != Self::BYTES {
            return false;
        }
        if Self::BYTES < 3 + MIN_PAD_LEN + SHA256_DIGEST_INFO.len() + DIGEST_SIZE {
            return false;
        }

        // Big-endian bytes to little-endian words.
        let mut a = [0u32; WORDS];
        for (dest, src) in a.iter_mut().rev().zip(signature.chunks_exact(4)) {
            *dest = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        }

        let em = self.public_op(exponent, &a);
        bool::from(check_padding(&em, digest))
    }

    /// Computes `a^e mod n`.
    fn public_op(&self, exponent: Exponent, a: &[u32; WORDS]) -> [u32; WORDS] {
        let mut a_r = [0; WORDS];
        let mut aa_r = [0; WORDS];
        let mut aaa = [0; WORDS];

        // a_r = a * R mod n
        self.mont_mul(&mut a_r, a, &self.rr);
        match exponent {
            Exponent::F4 => {
                // 16 squarings take a*R to a^65536 * R, staying in the
                // Montgomery domain. The final multiply by plain `a` also
                // strips the factor of R.
                for _ in 0..8 {
                    self.mont_mul(&mut aa_r, &a_r, &a_r);
                    self.mont_mul(&mut a_r, &aa_r, &aa_r);
                }
                self.mont_mul(&mut aaa, &a_r, a);
            }
            Exponent::Three => {
                self.mont_mul(&mut aa_r, &a_r, &a_r);
                self.mont_mul(&mut aaa, &aa_r, a);
            }
        }

        // Montgomery results are below 2n, so one subtraction is enough.
        if self.ge_mod(&aaa) {
            self.sub_mod(&mut aaa);
        }
        aaa
    }

    /// `c = a * b / R mod n`.
    fn mont_mul(&self, c: &mut [u32; WORDS], a: &[u32; WORDS], b: &[u32; WORDS]) {
        c.fill(0);
        for &word in a {
            self.mont_mul_add(c, word, b);
        }
    }

    /// `c = (c + a * b) / 2^32 mod n`, one word of `a` at a time.
    fn mont_mul_add(&self, c: &mut [u32; WORDS], a: u32, b: &[u32; WORDS]) {
        let a = u64::from(a);
        let mut acc = a * u64::from(b[0]) + u64::from(c[0]);
        let d0 = (acc as u32).wrapping_mul(self.n0inv);
        let d0 = u64::from(d0);
        let mut red = d0 * u64::from(self.n[0]) + u64::from(acc as u32);

        for i in 1..WORDS {
            acc = (acc >> 32) + a * u64::from(b[i]) + u64::from(c[i]);
            red = (red >> 32) + d0 * u64::from(self.n[i]) + u64::from(acc as u32);
            c[i - 1] = red as u32;
        }

        acc = (acc >> 32) + (red >> 32);
        c[WORDS - 1] = acc as u32;

        if acc >> 32 != 0 {
            self.sub_mod(c);
        }
    }

    /// `a -= n`, discarding the final borrow.
    fn sub_mod(&self, a: &mut [u32; WORDS]) {
        let mut borrow: i64 = 0;
        for (word, &n) in a.iter_mut().zip(&self.n) {
            borrow += i64::from(*word) - i64::from(n);
            *word = borrow as u32;
            borrow >>= 32;
        }
    }

    /// `a >= n`
    fn ge_mod(&self, a: &[u32; WORDS]) -> bool {
        for (&a, &n) in a.iter().zip(&self.n).rev() {
            if a != n {
                return a > n;
            }
        }
        true
    }
}

/// Byte `i` of the big-endian rendering of `em`.
fn em_byte<const WORDS: usize>(em: &[u32; WORDS], i: usize) -> u8 {
    let word = em[WORDS - 1 - i / 4];
    (word >> (8 * (3 - i % 4))) as u8
}

/// Checks `em` against `00 01 FF .. FF 00 DigestInfo digest`.
///
/// Every byte is examined regardless of earlier mismatches, and the digest
/// comparison is constant-time.
fn check_padding<const WORDS: usize>(em: &[u32; WORDS], digest: &Digest) -> Choice {
    let len = WORDS * 4;
    let info_start = len - DIGEST_SIZE - SHA256_DIGEST_INFO.len();

    let mut bad = em_byte(em, 0) | (em_byte(em, 1) ^ 0x01);
    for i in 2..info_start - 1 {
        bad |= em_byte(em, i) ^ 0xFF;
    }
    bad |= em_byte(em, info_start - 1);
    for (i, &b) in SHA256_DIGEST_INFO.iter().enumerate() {
        bad |= em_byte(em, info_start + i) ^ b;
    }

    let mut found = [0; DIGEST_SIZE];
    for (i, dest) in found.iter_mut().enumerate() {
        *dest = em_byte(em, len - DIGEST_SIZE + i);
    }

    bad.ct_eq(&0) & found[..].ct_eq(&digest[..])
}
