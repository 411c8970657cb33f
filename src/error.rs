use std::convert::From;
use std::error::Error;
use std::fmt;
use std::io;

use gss::GssError;

pub type KexResult<T> = Result<T, KexError>;

#[derive(Debug)]
pub enum KexError {
    /// The transport failed underneath the exchange.
    IoError(io::Error),
    /// The peer left the expected message grammar or sent a bad value.
    /// The reason is sent to the peer in the disconnect message.
    ProtocolError(String),
    /// A local invariant does not hold; the connection is dropped.
    FatalError(String),
    /// The local security mechanism failed.
    ContextError(GssError),
    /// The peer reported a mechanism failure with SSH_MSG_KEXGSS_ERROR.
    PeerError {
        major: u32,
        minor: u32,
        message: String,
        language: String,
    },
}

impl KexError {
    pub fn protocol<S: Into<String>>(reason: S) -> KexError {
        KexError::ProtocolError(reason.into())
    }

    pub fn fatal<S: Into<String>>(reason: S) -> KexError {
        KexError::FatalError(reason.into())
    }

    pub fn is_protocol_error(&self) -> bool {
        match self
        {
            &KexError::ProtocolError(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for KexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::KexError::*;
        match self
        {
            &IoError(ref err) => write!(f, "key exchange io error: {}", err),
            &ProtocolError(ref reason) => {
                write!(f, "key exchange protocol error: {}", reason)
            }
            &FatalError(ref reason) => {
                write!(f, "key exchange failed: {}", reason)
            }
            &ContextError(ref err) => {
                write!(f, "security context error: {}", err)
            }
            &PeerError {
                major,
                minor,
                ref message,
                ..
            } => write!(
                f,
                "peer GSSAPI error (major {}, minor {}): {}",
                major,
                minor,
                message
            ),
        }
    }
}

impl Error for KexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self
        {
            &KexError::IoError(ref err) => Some(err),
            &KexError::ContextError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for KexError {
    fn from(err: io::Error) -> KexError {
        KexError::IoError(err)
    }
}

impl From<GssError> for KexError {
    fn from(err: GssError) -> KexError {
        KexError::ContextError(err)
    }
}
