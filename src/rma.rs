//! RMA reset authorization.
//!
//! To authorize a factory reset, the device issues a challenge string
//! containing a fresh X25519 public key. An operator sends it to the RMA
//! server, which combines it with its own private key and returns an 8
//! character authcode. Both sides derive the code as the first 40 bits of
//! HMAC-SHA256, keyed with the ECDH shared secret, over the challenge after its
//! version byte.
//!
//! A challenge allows [`MAX_AUTHCODE_TRIES`] attempts. New challenges are rate
//! limited to one per [`CHALLENGE_INTERVAL_MS`], since each one resets the try
//! counter.

use crate::base32::{self, Base32Error};
use crate::sha256;
use core::mem::size_of;
use rand_core::{CryptoRng, RngCore};
use ringbuf::{ringbuf_entry, Ringbuf};
use static_assertions::const_assert_eq;
use subtle::{Choice, ConstantTimeEq};
use x25519_dalek::{EphemeralSecret, PublicKey};
use zerocopy::{AsBytes, FromBytes, Unaligned};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum time between challenges.
pub const CHALLENGE_INTERVAL_MS: u64 = 10_000;

pub const MAX_AUTHCODE_TRIES: u8 = 3;

/// Challenge structure version carried in the top two bits of the first byte.
pub const CHALLENGE_VERSION: u8 = 0;

pub const BOARD_ID_SIZE: usize = 4;
pub const DEVICE_ID_SIZE: usize = 8;

/// A CRC5 symbol follows this many data symbols in the challenge string.
pub const CHALLENGE_CRC_EVERY: usize = 9;

pub const CHALLENGE_CHARS: usize =
    base32::encoded_len(size_of::<RmaChallenge>(), CHALLENGE_CRC_EVERY);

/// Authcodes are this many bytes of HMAC output, as base32 without CRCs.
pub const AUTHCODE_BYTES: usize = 5;
pub const AUTHCODE_CHARS: usize = base32::encoded_len(AUTHCODE_BYTES, 0);

const_assert_eq!(CHALLENGE_CHARS, 80);
const_assert_eq!(AUTHCODE_CHARS, 8);

/// The challenge as it is encoded into the string.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct RmaChallenge {
    /// Version in the top two bits, server key id in the rest.
    pub version_key_id: u8,
    /// The device's ephemeral X25519 public key.
    pub device_pub_key: [u8; 32],
    pub board_id: [u8; BOARD_ID_SIZE],
    pub device_id: [u8; DEVICE_ID_SIZE],
}

const_assert_eq!(size_of::<RmaChallenge>(), 45);

impl RmaChallenge {
    pub fn version(&self) -> u8 {
        self.version_key_id >> 6
    }

    pub fn key_id(&self) -> u8 {
        self.version_key_id & 0x3f
    }

    pub fn encode(&self) -> ChallengeString {
        let mut s = ChallengeString([0; CHALLENGE_CHARS]);
        // Both sizes are fixed and agree, checked above.
        let _ = base32::encode(self.as_bytes(), CHALLENGE_CRC_EVERY, &mut s.0);
        s
    }

    /// Parses a challenge string, tolerating spaces, dashes and lower case.
    pub fn decode(s: &[u8]) -> Result<Self, RmaError> {
        let mut raw = [0; size_of::<RmaChallenge>()];
        let n = base32::decode(s, CHALLENGE_CRC_EVERY, &mut raw)
            .map_err(RmaError::Encoding)?;
        if n != raw.len() {
            return Err(RmaError::BadLength);
        }
        let c = Self::read_from(&raw[..]).ok_or(RmaError::BadLength)?;
        if c.version() != CHALLENGE_VERSION {
            return Err(RmaError::UnsupportedVersion);
        }
        Ok(c)
    }
}

/// The 80 character challenge string.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChallengeString([u8; CHALLENGE_CHARS]);

impl ChallengeString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ever holds characters from the base32 alphabet.
        core::str::from_utf8(&self.0).unwrap_or("")
    }
}

/// An 8 character authcode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Authcode([u8; AUTHCODE_CHARS]);

impl Authcode {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RmaError {
    /// Less than [`CHALLENGE_INTERVAL_MS`] since the last challenge.
    RateLimited,
    /// A challenge string that does not decode.
    Encoding(Base32Error),
    /// A challenge string that decodes to the wrong number of bytes.
    BadLength,
    UnsupportedVersion,
    /// The shared secret could not be used as an HMAC key.
    KeyDerivation,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuthError {
    /// No live challenge: none was issued, it was used, or its tries are gone.
    AccessDenied,
    /// Wrong code. Counts against the challenge's tries.
    Invalid,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RmaState {
    Idle,
    ChallengeIssued,
    Exhausted,
    Verified,
}

/// Monotonic time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Fixed identity of this device and the server it talks to.
#[derive(Copy, Clone, Debug)]
pub struct RmaConfig {
    pub server_public_key: [u8; 32],
    /// Identifies `server_public_key` to the server; six bits.
    pub server_key_id: u8,
    pub board_id: [u8; BOARD_ID_SIZE],
    pub device_id: [u8; DEVICE_ID_SIZE],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    ChallengeIssued { at_ms: u64 },
    RateLimited { since_last_ms: u64 },
    Denied,
    WrongCode { tries_left: u8 },
    Exhausted,
    Verified,
}

/// Secrets of the live challenge. Wiped as soon as the challenge is finished.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Pending {
    challenge: [u8; CHALLENGE_CHARS],
    authcode: [u8; AUTHCODE_CHARS],
}

pub struct RmaEngine<C, R> {
    config: RmaConfig,
    clock: C,
    rng: R,
    last_challenge_ms: Option<u64>,
    tries_left: u8,
    state: RmaState,
    pending: Pending,
    trace: Ringbuf<Trace, 16>,
}

impl<C: Clock, R: RngCore + CryptoRng> RmaEngine<C, R> {
    pub fn new(config: RmaConfig, clock: C, rng: R) -> Self {
        Self {
            config,
            clock,
            rng,
            last_challenge_ms: None,
            tries_left: 0,
            state: RmaState::Idle,
            pending: Pending {
                challenge: [0; CHALLENGE_CHARS],
                authcode: [0; AUTHCODE_CHARS],
            },
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn state(&self) -> RmaState {
        self.state
    }

    pub fn tries_left(&self) -> u8 {
        self.tries_left
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 16> {
        &self.trace
    }

    /// The live challenge, for redisplay.
    pub fn pending_challenge(&self) -> Option<&str> {
        if self.tries_left == 0 {
            return None;
        }
        core::str::from_utf8(&self.pending.challenge).ok()
    }

    /// Starts a new challenge, replacing any live one.
    ///
    /// A rate-limited request leaves the current challenge untouched.
    pub fn create_challenge(&mut self) -> Result<ChallengeString, RmaError> {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_challenge_ms {
            // A clock that appears to run backwards is treated as too soon.
            let since = now.saturating_sub(last);
            if since < CHALLENGE_INTERVAL_MS {
                ringbuf_entry!(self.trace, Trace::RateLimited { since_last_ms: since });
                return Err(RmaError::RateLimited);
            }
        }
        self.last_challenge_ms = Some(now);
        self.clear();

        let secret = EphemeralSecret::random_from_rng(&mut self.rng);
        let challenge = RmaChallenge {
            version_key_id: CHALLENGE_VERSION << 6 | (self.config.server_key_id & 0x3f),
            device_pub_key: PublicKey::from(&secret).to_bytes(),
            board_id: self.config.board_id,
            device_id: self.config.device_id,
        };
        let encoded = challenge.encode();

        let server = PublicKey::from(self.config.server_public_key);
        let shared = secret.diffie_hellman(&server);
        let authcode = compute_authcode(shared.as_bytes(), &challenge)?;

        self.pending.challenge = encoded.0;
        self.pending.authcode = authcode.0;
        self.tries_left = MAX_AUTHCODE_TRIES;
        self.state = RmaState::ChallengeIssued;
        ringbuf_entry!(self.trace, Trace::ChallengeIssued { at_ms: now });

        Ok(encoded)
    }

    /// Checks an authcode typed in by the operator.
    pub fn try_authcode(&mut self, candidate: &[u8]) -> Result<(), AuthError> {
        if self.tries_left == 0 {
            ringbuf_entry!(self.trace, Trace::Denied);
            return Err(AuthError::AccessDenied);
        }

        // Wrong lengths are ordinary mismatches; they still use up a try.
        let matched = if candidate.len() == AUTHCODE_CHARS {
            candidate.ct_eq(&self.pending.authcode[..])
        } else {
            Choice::from(0)
        };

        if bool::from(matched) {
            self.clear();
            self.state = RmaState::Verified;
            ringbuf_entry!(self.trace, Trace::Verified);
            return Ok(());
        }

        self.tries_left -= 1;
        ringbuf_entry!(self.trace, Trace::WrongCode { tries_left: self.tries_left });
        if self.tries_left == 0 {
            self.clear();
            self.state = RmaState::Exhausted;
            ringbuf_entry!(self.trace, Trace::Exhausted);
        }
        Err(AuthError::Invalid)
    }

    fn clear(&mut self) {
        self.tries_left = 0;
        self.pending.zeroize();
    }
}

/// Derives the authcode for `challenge` from the ECDH shared secret.
fn compute_authcode(
    shared: &[u8; 32],
    challenge: &RmaChallenge,
) -> Result<Authcode, RmaError> {
    let mut mac = sha256::hmac(shared, &challenge.as_bytes()[1..])
        .map_err(|_| RmaError::KeyDerivation)?;
    let mut code = Authcode([0; AUTHCODE_CHARS]);
    let _ = base32::encode(&mac[..AUTHCODE_BYTES], 0, &mut code.0);
    mac.zeroize();
    Ok(code)
}

/// Server side: computes the authcode that answers `challenge`, given the
/// private key matching the device's configured server public key.
pub fn server_authcode(
    server_secret: &[u8; 32],
    challenge: &[u8],
) -> Result<Authcode, RmaError> {
    let c = RmaChallenge::decode(challenge)?;
    let mut shared = x25519_dalek::x25519(*server_secret, c.device_pub_key);
    let code = compute_authcode(&shared, &c);
    shared.zeroize();
    code
}
