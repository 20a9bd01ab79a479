//! Client side of EC-to-EC host commands.
//!
//! A base EC talks to the EC in a detachable keyboard or battery pack over a
//! half-duplex UART using version 4 host command packets: an 8-byte header
//! protected by its own CRC-8, then the data, then (if there is any data) a
//! CRC-8 of the data. The response has the same shape. Every command waits out
//! a fixed settle time first, since the peer may still be turning the line
//! around after the previous response.

use core::mem::size_of;
use crc_catalog::{Algorithm, CRC_8_SMBUS};
use ringbuf::{ringbuf_entry, Ringbuf};
use static_assertions::const_assert_eq;
use tinycrc::Crc8;
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{AsBytes, FromBytes, Unaligned};

const CRC: &Algorithm<u8> = &CRC_8_SMBUS;

pub const HOST_REQUEST4_VERSION: u8 = 4;

/// Pause before every command.
pub const COMMAND_DEBOUNCE_MS: u32 = 10;

/// How long to wait for the peer to start answering.
pub const RESPONSE_TIMEOUT_MS: u32 = 100;

const FIELDS0_VERSION_MASK: u8 = 0x0f;
const FIELDS0_IS_RESPONSE: u8 = 1 << 4;
const FIELDS0_SEQ_SHIFT: u8 = 5;
const FIELDS0_SEQ_MASK: u8 = 0x3 << FIELDS0_SEQ_SHIFT;
const FIELDS1_COMMAND_VERSION_MASK: u8 = 0x1f;
const FIELDS1_DATA_CRC_PRESENT: u8 = 1 << 7;

#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct HostRequest4 {
    /// Struct version, is-response flag, sequence number.
    pub fields0: u8,
    /// Command version, data-CRC-present flag.
    pub fields1: u8,
    pub command: U16<LittleEndian>,
    pub data_len: U16<LittleEndian>,
    pub reserved: u8,
    pub header_crc: u8,
}

#[derive(Copy, Clone, Debug, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct HostResponse4 {
    pub fields0: u8,
    pub fields1: u8,
    pub result: U16<LittleEndian>,
    pub data_len: U16<LittleEndian>,
    pub reserved: u8,
    pub header_crc: u8,
}

const_assert_eq!(size_of::<HostRequest4>(), 8);
const_assert_eq!(size_of::<HostResponse4>(), 8);

/// CRC over everything but the trailing CRC byte.
fn header_crc(header: &[u8]) -> u8 {
    crc_of(&header[..header.len() - 1])
}

fn crc_of(data: &[u8]) -> u8 {
    let mut crc = Crc8::new(CRC);
    crc.update(data);
    crc.finish()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EcEcError {
    /// The peer didn't answer, or stopped partway.
    Timeout,
    /// A header or data CRC didn't match.
    Crc,
    /// The answer was well formed but not what we asked for.
    BadResponse,
    /// The peer ran the command and reported this non-zero result.
    Result(u16),
    /// The request doesn't fit in a packet.
    TooLong,
}

/// Half-duplex byte pipe to the peer EC.
pub trait EcEcTransport {
    /// Discards anything already received.
    fn flush_rx(&mut self);

    fn write(&mut self, data: &[u8]) -> Result<(), EcEcError>;

    /// Fills `buf` completely, giving up with [`EcEcError::Timeout`] if
    /// `timeout_ms` passes without it doing so.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), EcEcError>;
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trace {
    None,
    Sent { command: u16, seq: u8, len: u16 },
    HeaderCrc,
    DataCrc,
    NotResponse(u8),
    BadLength { expected: u16, got: u16 },
    Failed { command: u16, result: u16 },
    Ok(u16),
}

pub struct EcEcClient<T, D> {
    transport: T,
    delay: D,
    seq: u8,
    trace: Ringbuf<Trace, 16>,
}

impl<T: EcEcTransport, D: Delay> EcEcClient<T, D> {
    pub fn new(transport: T, delay: D) -> Self {
        Self {
            transport,
            delay,
            seq: 0,
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn trace(&self) -> &Ringbuf<Trace, 16> {
        &self.trace
    }

    /// Sends `command` (at `version`) with `data`, and reads back exactly
    /// `response.len()` bytes of response data.
    pub fn write_command(
        &mut self,
        command: u16,
        version: u8,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<(), EcEcError> {
        let data_len = u16::try_from(data.len()).map_err(|_| EcEcError::TooLong)?;
        let expected_len = u16::try_from(response.len()).map_err(|_| EcEcError::TooLong)?;

        let seq = self.seq;
        self.seq = (self.seq + 1) & (FIELDS0_SEQ_MASK >> FIELDS0_SEQ_SHIFT);

        let mut request = HostRequest4 {
            fields0: HOST_REQUEST4_VERSION | seq << FIELDS0_SEQ_SHIFT,
            fields1: (version & FIELDS1_COMMAND_VERSION_MASK)
                | if data.is_empty() { 0 } else { FIELDS1_DATA_CRC_PRESENT },
            command: U16::new(command),
            data_len: U16::new(data_len),
            reserved: 0,
            header_crc: 0,
        };
        request.header_crc = header_crc(request.as_bytes());

        self.delay.delay_ms(COMMAND_DEBOUNCE_MS);
        self.transport.flush_rx();

        self.transport.write(request.as_bytes())?;
        if !data.is_empty() {
            self.transport.write(data)?;
            self.transport.write(&[crc_of(data)])?;
        }
        ringbuf_entry!(
            self.trace,
            Trace::Sent {
                command,
                seq,
                len: data_len,
            }
        );

        let mut header = HostResponse4::new_zeroed();
        self.transport
            .read(header.as_bytes_mut(), RESPONSE_TIMEOUT_MS)?;

        if header.header_crc != header_crc(header.as_bytes()) {
            ringbuf_entry!(self.trace, Trace::HeaderCrc);
            return Err(EcEcError::Crc);
        }
        if header.fields0 & FIELDS0_IS_RESPONSE == 0
            || header.fields0 & FIELDS0_VERSION_MASK != HOST_REQUEST4_VERSION
        {
            ringbuf_entry!(self.trace, Trace::NotResponse(header.fields0));
            return Err(EcEcError::BadResponse);
        }

        let result = header.result.get();
        if result != 0 {
            ringbuf_entry!(self.trace, Trace::Failed { command, result });
            return Err(EcEcError::Result(result));
        }

        let got = header.data_len.get();
        if got != expected_len {
            ringbuf_entry!(
                self.trace,
                Trace::BadLength {
                    expected: expected_len,
                    got,
                }
            );
            return Err(EcEcError::BadResponse);
        }

        if !response.is_empty() {
            if header.fields1 & FIELDS1_DATA_CRC_PRESENT == 0 {
                return Err(EcEcError::BadResponse);
            }
            self.transport.read(response, RESPONSE_TIMEOUT_MS)?;
            let mut crc = [0];
            self.transport.read(&mut crc, RESPONSE_TIMEOUT_MS)?;
            if crc[0] != crc_of(response) {
                ringbuf_entry!(self.trace, Trace::DataCrc);
                return Err(EcEcError::Crc);
            }
        }

        ringbuf_entry!(self.trace, Trace::Ok(command));
        Ok(())
    }
}
