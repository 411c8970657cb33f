use std::fmt;
use std::io::{self, Result, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigUint;

use message::MessageType;

/// Largest frame accepted from the peer.
pub const MAX_PACKET_LEN: usize = 256 * 1024;

pub struct Packet {
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(msg_type: MessageType) -> Packet {
        Packet { payload: vec![msg_type.into()] }
    }

    /// Wraps a complete payload, message type byte included.
    pub fn from_payload(payload: Vec<u8>) -> Result<Packet> {
        if payload.is_empty() {
            return Err(invalid_data("empty packet payload"));
        }
        Ok(Packet { payload: payload })
    }

    pub fn msg_type(&self) -> MessageType {
        self.payload[0].into()
    }

    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    pub fn read_from<R: io::Read>(stream: &mut R) -> Result<Packet> {
        let packet_len = stream.read_u32::<BigEndian>()? as usize;
        let padding_len = stream.read_u8()? as usize;

        if packet_len > MAX_PACKET_LEN {
            return Err(invalid_data("packet too large"));
        }
        if padding_len + 1 >= packet_len {
            return Err(invalid_data("invalid padding length"));
        }

        let payload_len = packet_len - padding_len - 1;

        let mut payload = vec![0; payload_len];
        let mut padding = vec![0; padding_len];

        stream.read_exact(&mut payload)?;
        stream.read_exact(&mut padding)?;

        Ok(Packet { payload: payload })
    }

    pub fn write_to<W: io::Write>(&self, stream: &mut W) -> Result<()> {
        let padding_len = self.padding_len();
        let packet_len = self.payload.len() + padding_len + 1;

        stream.write_u32::<BigEndian>(packet_len as u32)?;
        stream.write_u8(padding_len as u8)?;
        stream.write_all(&self.payload)?;
        stream.write_all(&[0u8; 255][..padding_len])?;
        stream.flush()?;

        Ok(())
    }

    /// Reader positioned after the message type byte.
    pub fn reader<'a>(&'a self) -> &'a [u8] {
        &self.payload.as_slice()[1..]
    }

    pub fn padding_len(&self) -> usize {
        // Calculate the padding to reach a multiple of 8 bytes
        let padding_len = 8 - ((self.payload.len() + 5) % 8);

        // The padding has to be at least 4 bytes long
        if padding_len < 4 {
            padding_len + 8
        }
        else {
            padding_len
        }
    }
}

impl Write for Packet {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.payload.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_owned())
}

pub trait ReadPacketExt: ReadBytesExt {
    fn read_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32::<BigEndian>()?;
        self.read_bytes(len as usize)
    }

    fn read_mpint(&mut self) -> Result<BigUint> {
        let bytes = self.read_string()?;
        if bytes.first().map_or(false, |b| b & 0x80 != 0) {
            return Err(invalid_data("negative mpint"));
        }
        Ok(BigUint::from_bytes_be(bytes.as_slice()))
    }

    fn read_uint32(&mut self) -> Result<u32> {
        Ok(self.read_u32::<BigEndian>()?)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > MAX_PACKET_LEN {
            return Err(invalid_data("string too long"));
        }
        let mut buffer = vec![0; len];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Invalid sequences decode to U+FFFD rather than failing.
    fn read_utf8(&mut self) -> Result<String> {
        let bytes = self.read_string()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.read_u8().map(|i| i != 0)
    }
}

impl<R: ReadBytesExt + ?Sized> ReadPacketExt for R {}

pub trait WritePacketExt: WriteBytesExt {
    fn write_string(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        self.write_bytes(bytes)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_uint32(bytes.len() as u32)?;
        self.write_all(bytes)
    }

    fn write_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(if value { 1 } else { 0 })
    }

    fn write_mpint(&mut self, value: &BigUint) -> Result<()> {
        self.write_mpint_bytes(&value.to_bytes_be())
    }

    /// Writes an unsigned big-endian magnitude as an mpint.
    fn write_mpint_bytes(&mut self, magnitude: &[u8]) -> Result<()> {
        let start = magnitude
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(magnitude.len());
        let magnitude = &magnitude[start..];

        if magnitude.is_empty() {
            return self.write_uint32(0);
        }

        if magnitude[0] & 0x80 != 0 {
            self.write_uint32(magnitude.len() as u32 + 1)?;
            self.write_u8(0)?;
        }
        else {
            self.write_uint32(magnitude.len() as u32)?;
        }
        self.write_all(magnitude)
    }

    fn write_uint32(&mut self, value: u32) -> Result<()> {
        self.write_u32::<BigEndian>(value)
    }
}

impl<W: WriteBytesExt + ?Sized> WritePacketExt for W {}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Packet({:?}, {} bytes)",
            self.msg_type(),
            self.payload.len()
        )
    }
}
