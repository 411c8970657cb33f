//! Boundary to the GSSAPI mechanism.
//!
//! Token generation and verification happen behind [`SecurityContext`];
//! the key exchange only moves opaque tokens between the two contexts
//! and checks the flags they report on completion.

use std::error::Error;
use std::fmt;
use std::ops::BitOr;

use crypto::digest::Digest;
use crypto::md5::Md5;
use rustc_serialize::base64::{ToBase64, STANDARD};

use algorithm::{self, GssKexAlgorithm};

/// GSS_S_FAILURE, reported when a mechanism does not give a better code.
pub const GSS_S_FAILURE: u32 = 13 << 16;

/// Mechanism object identifier, stored as the DER contents octets.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Oid(Vec<u8>);

impl Oid {
    pub fn from_bytes(bytes: &[u8]) -> Oid {
        Oid(bytes.to_vec())
    }

    /// Kerberos V5, 1.2.840.113554.1.2.2
    pub fn krb5() -> Oid {
        Oid(vec![0x2a, 0x86, 0x48, 0x86, 0xf7, 0x12, 0x01, 0x02, 0x02])
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Complete DER encoding, tag and length included.
    pub fn to_der(&self) -> Vec<u8> {
        let mut der = vec![0x06];
        let len = self.0.len();
        if len < 0x80 {
            der.push(len as u8);
        }
        else {
            let len_bytes: Vec<u8> = (0..4)
                .rev()
                .map(|i| (len >> (8 * i)) as u8)
                .skip_while(|&b| b == 0)
                .collect();
            der.push(0x80 | len_bytes.len() as u8);
            der.extend_from_slice(&len_bytes);
        }
        der.extend_from_slice(&self.0);
        der
    }

    /// Suffix used in key exchange method names: base64 of the MD5 of the
    /// DER encoded OID.
    pub fn kex_hash(&self) -> String {
        let mut md5 = Md5::new();
        md5.input(&self.to_der());
        let mut digest = [0u8; 16];
        md5.result(&mut digest);
        digest.to_base64(STANDARD)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut values = Vec::new();
        let mut value: u64 = 0;
        for byte in self.0.iter() {
            value = (value << 7) | (byte & 0x7f) as u64;
            if byte & 0x80 == 0 {
                values.push(value);
                value = 0;
            }
        }

        let mut arcs = Vec::new();
        if let Some((&first, rest)) = values.split_first() {
            let top = if first < 80 { first / 40 } else { 2 };
            arcs.push(top);
            arcs.push(first - top * 40);
            arcs.extend_from_slice(rest);
        }

        let arcs: Vec<String> = arcs.iter().map(|a| a.to_string()).collect();
        f.write_str(&arcs.join("."))
    }
}

/// Target service name, e.g. `host@server.example.org`.
#[derive(Clone, PartialEq, Debug)]
pub struct PeerName(pub String);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ContextFlags(pub u32);

impl ContextFlags {
    pub const DELEG: ContextFlags = ContextFlags(1);
    pub const MUTUAL: ContextFlags = ContextFlags(2);
    pub const REPLAY: ContextFlags = ContextFlags(4);
    pub const SEQUENCE: ContextFlags = ContextFlags(8);
    pub const CONF: ContextFlags = ContextFlags(16);
    pub const INTEG: ContextFlags = ContextFlags(32);

    pub fn empty() -> ContextFlags {
        ContextFlags(0)
    }

    pub fn contains(&self, other: ContextFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ContextFlags {
    type Output = ContextFlags;

    fn bitor(self, rhs: ContextFlags) -> ContextFlags {
        ContextFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ContextStatus {
    Complete,
    ContinueNeeded,
}

/// Result of one initiate/accept call.
#[derive(Clone, Debug)]
pub struct ContextStep {
    pub status: ContextStatus,
    /// Token for the peer, empty if there is nothing to send.
    pub token: Vec<u8>,
    /// Negotiated flags, meaningful once the status is `Complete`.
    pub flags: ContextFlags,
}

#[derive(Clone, Debug)]
pub struct GssError {
    pub major: u32,
    pub minor: u32,
    pub message: String,
    /// Partial output token the mechanism produced before failing.
    pub token: Vec<u8>,
}

impl GssError {
    pub fn new<S: Into<String>>(message: S) -> GssError {
        GssError {
            major: GSS_S_FAILURE,
            minor: 0,
            message: message.into(),
            token: Vec::new(),
        }
    }
}

impl fmt::Display for GssError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (major {:#x}, minor {})",
            self.message,
            self.major,
            self.minor
        )
    }
}

impl Error for GssError {}

/// One established or establishing security context.
///
/// `step` is `gss_init_sec_context` for contexts created by
/// [`GssProvider::initiator`] and `gss_accept_sec_context` for those created
/// by [`GssProvider::acceptor`]. The first initiator call gets no token.
pub trait SecurityContext {
    fn step(&mut self, token: Option<&[u8]>) -> Result<ContextStep, GssError>;

    /// Compute a MIC over `data`.
    fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>, GssError>;

    fn verify_mic(&mut self, data: &[u8], mic: &[u8]) -> Result<(), GssError>;
}

/// Source of security contexts, shared by all connections.
pub trait GssProvider: Send + Sync {
    /// Mechanisms usable for key exchange, in preference order.
    fn mechanisms(&self) -> Vec<Oid>;

    fn import_name(&self, host: &str) -> Result<PeerName, GssError> {
        Ok(PeerName(format!("host@{}", host)))
    }

    fn initiator(
        &self,
        mech: &Oid,
        target: &PeerName,
        delegate: bool,
    ) -> Result<Box<dyn SecurityContext>, GssError>;

    /// Acquire acceptor credentials and create a context for `mech`.
    fn acceptor(&self, mech: &Oid) -> Result<Box<dyn SecurityContext>, GssError>;

    fn mechanism_for_method(&self, method: &str)
        -> Option<(GssKexAlgorithm, Oid)> {
        algorithm::identify(method, &self.mechanisms())
    }
}
