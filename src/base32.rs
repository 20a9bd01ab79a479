//! Base32 for strings that humans read off one screen and type into another.
//!
//! The alphabet drops `I`, `O`, `0` and `1`, which are easily confused. Bits
//! are taken most significant first, five at a time; the last symbol is padded
//! with zero bits. Optionally a CRC5 symbol follows every `crc_every` data
//! symbols so that typos are caught close to where they were made. A trailing
//! group shorter than `crc_every` gets no CRC.

use tinycrc::crc5_sym;

pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Base32Error {
    /// Output buffer too small.
    Overflow,
    /// A character outside the alphabet (after case folding).
    InvalidSymbol,
    /// A CRC symbol did not match the group before it.
    CrcMismatch,
    /// Input ended where a CRC symbol was due.
    MissingCrc,
}

/// Number of characters [`encode`] produces for `len` bytes.
pub const fn encoded_len(len: usize, crc_every: usize) -> usize {
    let symbols = (len * 8 + 4) / 5;
    if crc_every == 0 {
        symbols
    } else {
        symbols + symbols / crc_every
    }
}

fn encode_sym(sym: u8) -> u8 {
    ALPHABET[usize::from(sym & 0x1f)]
}

fn decode_sym(c: u8) -> Option<u8> {
    let c = c.to_ascii_uppercase();
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

/// The five bits of `src` starting at bit `bit`, reading past the end as zero.
fn sym_at(src: &[u8], bit: usize) -> u8 {
    let mut sym = 0;
    for b in bit..bit + 5 {
        let v = src.get(b / 8).map_or(0, |byte| (byte >> (7 - b % 8)) & 1);
        sym = sym << 1 | v;
    }
    sym
}

/// Encodes `src` into `out` as ASCII, returning the number of characters
/// written.
pub fn encode(src: &[u8], crc_every: usize, out: &mut [u8]) -> Result<usize, Base32Error> {
    let mut len = 0;
    let mut push = |c: u8| -> Result<(), Base32Error> {
        *out.get_mut(len).ok_or(Base32Error::Overflow)? = c;
        len += 1;
        Ok(())
    };

    let mut crc = 0;
    let mut group = 0;
    for i in 0..(src.len() * 8 + 4) / 5 {
        let sym = sym_at(src, i * 5);
        push(encode_sym(sym))?;

        if crc_every != 0 {
            crc = crc5_sym(sym, crc);
            group += 1;
            if group == crc_every {
                push(encode_sym(crc))?;
                crc = 0;
                group = 0;
            }
        }
    }
    Ok(len)
}

/// Decodes `src` into `out`, returning the number of whole bytes produced.
///
/// Spaces and dashes are ignored and letters may be in either case. Leftover
/// bits that do not make up a whole byte are padding and are discarded.
pub fn decode(src: &[u8], crc_every: usize, out: &mut [u8]) -> Result<usize, Base32Error> {
    let mut acc: u16 = 0;
    let mut bits = 0;
    let mut written = 0;
    let mut crc = 0;
    let mut group = 0;

    for &c in src {
        if c == b' ' || c == b'-' {
            continue;
        }
        let sym = decode_sym(c).ok_or(Base32Error::InvalidSymbol)?;

        if crc_every != 0 {
            if group == crc_every {
                if sym != crc {
                    return Err(Base32Error::CrcMismatch);
                }
                crc = 0;
                group = 0;
                continue;
            }
            crc = crc5_sym(sym, crc);
            group += 1;
        }

        acc = acc << 5 | u16::from(sym);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            *out.get_mut(written).ok_or(Base32Error::Overflow)? = (acc >> bits) as u8;
            written += 1;
            acc &= (1 << bits) - 1;
        }
    }

    if crc_every != 0 && group == crc_every {
        return Err(Base32Error::MissingCrc);
    }
    Ok(written)
}
