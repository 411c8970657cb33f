use crypto::digest::Digest;
use crypto::sha1::Sha1;
use crypto::sha2::Sha256;
use num_bigint::BigUint;
use zeroize::Zeroizing;

use key_exchange::{DhGroup, GroupRequest, SharedSecret};
use packet::WritePacketExt;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn output_len(&self) -> usize {
        match self
        {
            &HashAlgorithm::Sha1 => 20,
            &HashAlgorithm::Sha256 => 32,
        }
    }

    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self
        {
            &HashAlgorithm::Sha1 => digest(Sha1::new(), data),
            &HashAlgorithm::Sha256 => digest(Sha256::new(), data),
        }
    }
}

fn digest<D: Digest>(mut hasher: D, data: &[u8]) -> Vec<u8> {
    let mut hash = vec![0; hasher.output_bytes()];
    hasher.input(data);
    hasher.result(&mut hash);
    hash
}

/// Group parameters entering the hash of a group exchange.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeGroup<'a> {
    pub request: GroupRequest,
    pub group: &'a DhGroup,
}

/// Inputs of the exchange hash `H`. Both sides fill it in client/server
/// order, whichever role they play.
#[derive(Debug)]
pub struct Transcript<'a> {
    pub client_version: &'a str,
    pub server_version: &'a str,
    pub client_kexinit: &'a [u8],
    pub server_kexinit: &'a [u8],
    /// Host key blob from SSH_MSG_KEXGSS_HOSTKEY, empty when none was sent.
    pub host_key: &'a [u8],
    /// `None` for fixed-group methods.
    pub group: Option<ExchangeGroup<'a>>,
    pub client_public: &'a BigUint,
    pub server_public: &'a BigUint,
    pub shared_secret: &'a SharedSecret,
}

impl<'a> Transcript<'a> {
    /// Wire encoding of the hash input.
    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(Vec::new());

        let items = [
            self.client_version.as_bytes(),
            self.server_version.as_bytes(),
            self.client_kexinit,
            self.server_kexinit,
            self.host_key,
        ];

        for item in items.iter() {
            buf.write_bytes(item).ok();
        }

        if let Some(ref exchange) = self.group {
            buf.write_uint32(exchange.request.min).ok();
            buf.write_uint32(exchange.request.n).ok();
            buf.write_uint32(exchange.request.max).ok();
            buf.write_mpint(&exchange.group.p).ok();
            buf.write_mpint(&exchange.group.g).ok();
        }

        buf.write_mpint(self.client_public).ok();
        buf.write_mpint(self.server_public).ok();
        buf.write_raw_bytes(&self.shared_secret.to_mpint()).ok();

        buf
    }

    pub fn hash(&self, algorithm: HashAlgorithm) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(algorithm.hash(&self.encode()))
    }
}
