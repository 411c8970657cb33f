use std::io::{self, Read, Write};

use message::MessageType;
use packet::{Packet, WritePacketExt};

pub const SSH_DISCONNECT_PROTOCOL_ERROR: u32 = 2;

/// Packet layer underneath the key exchange.
pub trait Transport {
    fn send(&mut self, packet: Packet) -> io::Result<()>;

    /// Block until the next packet arrives.
    fn recv(&mut self) -> io::Result<Packet>;

    /// Tell the peer why the connection ends, then end it.
    fn disconnect(&mut self, reason: u32, description: &str) -> io::Result<()>;

    /// End the connection without notifying the peer.
    fn close(&mut self) {}
}

/// Unencrypted binary packet framing over a byte stream.
pub struct StreamTransport<S> {
    stream: S,
    seq: (u32, u32),
    closed: bool,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> StreamTransport<S> {
        StreamTransport {
            stream: stream,
            seq: (0, 0),
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
        }
        else {
            Ok(())
        }
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, packet: Packet) -> io::Result<()> {
        self.check_open()?;
        debug!("Sending packet {}: {:?}", self.seq.1, packet);

        packet.write_to(&mut self.stream)?;

        // Count up the sent packet sequence number
        self.seq.1 = self.seq.1.wrapping_add(1);
        Ok(())
    }

    fn recv(&mut self) -> io::Result<Packet> {
        self.check_open()?;
        let packet = Packet::read_from(&mut self.stream)?;

        debug!("Packet {} received: {:?}", self.seq.0, packet);

        // Count up the received packet sequence number
        self.seq.0 = self.seq.0.wrapping_add(1);
        Ok(packet)
    }

    fn disconnect(&mut self, reason: u32, description: &str) -> io::Result<()> {
        info!("Disconnecting: {}", description);

        let mut packet = Packet::new(MessageType::Disconnect);
        packet.write_uint32(reason)?;
        packet.write_string(description)?;
        packet.write_string("")?;

        let result = self.send(packet);
        self.closed = true;
        result
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
