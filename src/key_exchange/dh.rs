use std::fmt;

use num_bigint::{BigUint, RandBigInt};
use rand;
use zeroize::Zeroizing;

use error::{KexError, KexResult};
use key_exchange::DhGroup;
use packet::WritePacketExt;

/// Attempts at drawing an exponent before giving up.
const DH_MAX_TRIES: usize = 10;

/// Local key pair for one exchange. The private exponent never leaves
/// this struct and is wiped when it is dropped.
pub struct DhKeyPair {
    private: Zeroizing<Vec<u8>>,
    pub public: BigUint,
}

impl DhKeyPair {
    /// Generate a key pair for `group` able to supply `need_bits` of key
    /// material. The exponent is twice as long as the requirement.
    pub fn generate(group: &DhGroup, need_bits: u32) -> KexResult<DhKeyPair> {
        let pbits = group.bits();
        let length = need_bits as u64 * 2;

        if length >= pbits {
            return Err(KexError::fatal(format!(
                "group too small: {} (2*need {})",
                pbits,
                length
            )));
        }

        let mut rng = rand::thread_rng();
        for _ in 0..DH_MAX_TRIES {
            let x = Zeroizing::new(rng.gen_biguint(length).to_bytes_be());
            let exponent = BigUint::from_bytes_be(&x);
            let public = group.g.modpow(&exponent, &group.p);

            if group.is_valid_public(&public) {
                return Ok(DhKeyPair {
                    private: x,
                    public: public,
                });
            }
            trace!("Discarding degenerate DH public value");
        }

        Err(KexError::fatal("too many bad DH key generations"))
    }

    /// Compute the shared secret with the peer's public value, which has
    /// to pass [`DhGroup::is_valid_public`].
    pub fn compute_shared(&self, group: &DhGroup, peer_public: &BigUint)
        -> KexResult<SharedSecret> {
        if !group.is_valid_public(peer_public) {
            return Err(KexError::fatal(
                "shared secret requested for an unchecked DH value",
            ));
        }

        let exponent = BigUint::from_bytes_be(&self.private);
        let k = peer_public.modpow(&exponent, &group.p);

        Ok(SharedSecret(Zeroizing::new(k.to_bytes_be())))
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DhKeyPair({} bit public)", self.public.bits())
    }
}

/// The Diffie-Hellman shared secret `K` as an unsigned big-endian
/// integer, wiped on drop.
#[derive(Clone, PartialEq)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// `K` encoded as an SSH mpint, as it enters hashes and key schedules.
    pub fn to_mpint(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(Vec::with_capacity(self.0.len() + 5));
        buf.write_mpint_bytes(&self.0).ok();
        buf
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SharedSecret({} bytes)", self.0.len())
    }
}
