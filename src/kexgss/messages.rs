use std::io;

use num_bigint::BigUint;

use error::{KexError, KexResult};
use message::MessageType;
use packet::{Packet, ReadPacketExt, WritePacketExt};

pub const KEXGSS_INIT: u8 = 30;
pub const KEXGSS_CONTINUE: u8 = 31;
pub const KEXGSS_COMPLETE: u8 = 32;
pub const KEXGSS_HOSTKEY: u8 = 33;
pub const KEXGSS_ERROR: u8 = 34;
pub const KEXGSS_GROUPREQ: u8 = 40;
pub const KEXGSS_GROUP: u8 = 41;

/// Messages of the GSSAPI key exchange.
#[derive(Clone, PartialEq, Debug)]
pub enum GssMessage {
    GroupRequest { min: u32, n: u32, max: u32 },
    Group { p: BigUint, g: BigUint },
    Init { token: Vec<u8>, e: BigUint },
    Continue { token: Vec<u8> },
    Complete {
        f: BigUint,
        mic: Vec<u8>,
        token: Option<Vec<u8>>,
    },
    HostKey { key: Vec<u8> },
    Error {
        major: u32,
        minor: u32,
        message: String,
        language: String,
    },
}

impl GssMessage {
    pub fn id(&self) -> u8 {
        use self::GssMessage::*;
        match self
        {
            &GroupRequest { .. } => KEXGSS_GROUPREQ,
            &Group { .. } => KEXGSS_GROUP,
            &Init { .. } => KEXGSS_INIT,
            &Continue { .. } => KEXGSS_CONTINUE,
            &Complete { .. } => KEXGSS_COMPLETE,
            &HostKey { .. } => KEXGSS_HOSTKEY,
            &Error { .. } => KEXGSS_ERROR,
        }
    }

    pub fn to_packet(&self) -> Packet {
        let mut packet = Packet::new(MessageType::KeyExchange(self.id()));
        self.write_body(&mut packet).ok();
        packet
    }

    fn write_body(&self, w: &mut Packet) -> io::Result<()> {
        use self::GssMessage::*;
        match self
        {
            &GroupRequest { min, n, max } => {
                w.write_uint32(min)?;
                w.write_uint32(n)?;
                w.write_uint32(max)
            }
            &Group { ref p, ref g } => {
                w.write_mpint(p)?;
                w.write_mpint(g)
            }
            &Init { ref token, ref e } => {
                w.write_bytes(token)?;
                w.write_mpint(e)
            }
            &Continue { ref token } => w.write_bytes(token),
            &Complete {
                ref f,
                ref mic,
                ref token,
            } => {
                w.write_mpint(f)?;
                w.write_bytes(mic)?;
                match token
                {
                    &Some(ref token) => {
                        w.write_bool(true)?;
                        w.write_bytes(token)
                    }
                    &None => w.write_bool(false),
                }
            }
            &HostKey { ref key } => w.write_bytes(key),
            &Error {
                major,
                minor,
                ref message,
                ref language,
            } => {
                w.write_uint32(major)?;
                w.write_uint32(minor)?;
                w.write_string(message)?;
                w.write_string(language)
            }
        }
    }

    /// Decode a KEXGSS packet. Malformed bodies are protocol errors.
    pub fn from_packet(packet: &Packet) -> KexResult<GssMessage> {
        let id = match packet.msg_type()
        {
            MessageType::KeyExchange(id) => id,
            other => {
                return Err(KexError::protocol(
                    format!("didn't expect packet type {:?}", other),
                ))
            }
        };

        let mut reader = packet.reader();
        let message = read_body(id, &mut reader).map_err(|err| {
            KexError::protocol(format!("malformed message {}: {}", id, err))
        })?;

        if !reader.is_empty() {
            return Err(KexError::protocol(
                format!("trailing data in message {}", id),
            ));
        }

        Ok(message)
    }
}

fn read_body(id: u8, r: &mut &[u8]) -> io::Result<GssMessage> {
    Ok(match id
    {
        KEXGSS_GROUPREQ => GssMessage::GroupRequest {
            min: r.read_uint32()?,
            n: r.read_uint32()?,
            max: r.read_uint32()?,
        },
        KEXGSS_GROUP => GssMessage::Group {
            p: r.read_mpint()?,
            g: r.read_mpint()?,
        },
        KEXGSS_INIT => GssMessage::Init {
            token: r.read_string()?,
            e: r.read_mpint()?,
        },
        KEXGSS_CONTINUE => GssMessage::Continue { token: r.read_string()? },
        KEXGSS_COMPLETE => {
            let f = r.read_mpint()?;
            let mic = r.read_string()?;
            let token = if r.read_bool()? {
                Some(r.read_string()?)
            }
            else {
                None
            };
            GssMessage::Complete {
                f: f,
                mic: mic,
                token: token,
            }
        }
        KEXGSS_HOSTKEY => GssMessage::HostKey { key: r.read_string()? },
        KEXGSS_ERROR => GssMessage::Error {
            major: r.read_uint32()?,
            minor: r.read_uint32()?,
            message: r.read_utf8()?,
            language: r.read_utf8()?,
        },
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unknown KEXGSS message",
            ))
        }
    })
}
