//! `tinycrc`: tiny CRC implementations for protocol framing.
//!
//! This provides the two small checksums the firmware protocols need, focusing
//! on size over performance. Neither uses a lookup table.
//!
//! - [`Crc8`] is a bytewise CRC-8 whose parameters come from the `crc_catalog`
//!   crate, used by `crc` (a crate that you should use instead if performance is
//!   important). EC-to-EC host commands use [`crc_catalog::CRC_8_SMBUS`], the
//!   `x^8 + x^2 + x + 1` polynomial with a zero seed.
//! - [`crc5_sym`] folds one 5-bit symbol into a running 5-bit CRC using the
//!   `x^5 + x^2 + 1` polynomial. It protects human-transcribed base32 strings.

#![cfg_attr(not(test), no_std)]

use crc_catalog::Algorithm;

/// A CRC-8 operation-in-progress using a particular algorithm.
#[derive(Clone, Debug)]
pub struct Crc8 {
    /// Algorithm polynomial, pre-reflected if the algorithm is reflected.
    poly: u8,
    /// Should data be bit-reversed on the way in?
    reflect_in: bool,
    /// Should data be bit-reversed on the way out?
    reflect_out: bool,
    /// Value to XOR into the CRC at the end.
    xorout: u8,
    /// Current CRC value.
    value: u8,
}

impl Crc8 {
    /// Creates a new `Crc8` using `algorithm`'s settings.
    pub fn new(algorithm: &Algorithm<u8>) -> Self {
        debug_assert_eq!(algorithm.width, 8);
        let (poly, value) = if algorithm.refin {
            (algorithm.poly.reverse_bits(), algorithm.init.reverse_bits())
        } else {
            (algorithm.poly, algorithm.init)
        };
        Self {
            poly,
            reflect_in: algorithm.refin,
            reflect_out: algorithm.refout,
            xorout: algorithm.xorout,
            value,
        }
    }

    /// Updates this CRC with the content of `data`.
    pub fn update(&mut self, data: &[u8]) {
        if self.reflect_in {
            for &byte in data {
                self.value = crc8_reflect(self.poly, self.value ^ byte);
            }
        } else {
            for &byte in data {
                self.value = crc8_step(self.poly, self.value ^ byte);
            }
        }
    }

    /// Performs any final computations required and returns the computed CRC.
    pub fn finish(mut self) -> u8 {
        if self.reflect_in ^ self.reflect_out {
            self.value = self.value.reverse_bits();
        }
        self.value ^ self.xorout
    }
}

/// One-shot CRC-8/SMBUS over `data`, the checksum used on EC-EC host command
/// headers and payloads.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = Crc8::new(&crc_catalog::CRC_8_SMBUS);
    crc.update(data);
    crc.finish()
}

fn crc8_reflect(poly: u8, mut value: u8) -> u8 {
    for _ in 0..8 {
        value = (value >> 1) ^ ((value & 1) * poly);
    }
    value
}

fn crc8_step(poly: u8, mut value: u8) -> u8 {
    for _ in 0..8 {
        value = (value << 1) ^ (((value >> 7) & 1) * poly);
    }
    value
}

/// `x^5 + x^2 + 1`, including the leading term.
const CRC5_POLY: u16 = 0b10_0101;

/// Folds `sym` into `previous_crc` and returns the new CRC.
///
/// Only the low 5 bits of both arguments are significant. The result is the
/// remainder of `(previous_crc * x^5 + sym) * x^5` modulo the generator. Since
/// the generator is primitive, for any fixed `previous_crc` every distinct
/// `sym` produces a distinct CRC, so any single-symbol substitution is caught.
pub fn crc5_sym(sym: u8, previous_crc: u8) -> u8 {
    let mut value = (u16::from(previous_crc & 0x1f) << 5
        | u16::from(sym & 0x1f))
        << 5;
    for bit in (5..15).rev() {
        if value & (1 << bit) != 0 {
            value ^= CRC5_POLY << (bit - 5);
        }
    }
    (value & 0x1f) as u8
}
