mod dh;
mod group;
mod hash;

pub use self::dh::{DhKeyPair, SharedSecret};
pub use self::group::{dh_estimate, DhGroup, GroupRequest, GroupTable,
                      DH_GRP_MAX, DH_GRP_MIN};
pub use self::hash::{ExchangeGroup, HashAlgorithm, Transcript};

use zeroize::Zeroizing;

use error::KexResult;

/// Material handed to session key derivation after a successful exchange.
/// Both values are wiped when it is dropped.
#[derive(Debug)]
pub struct ExchangeResult {
    pub exchange_hash: Zeroizing<Vec<u8>>,
    pub shared_secret: SharedSecret,
}

/// Session key derivation, fed once per completed exchange.
pub trait KeyDerivation {
    fn derive(&mut self, result: ExchangeResult, session_id: &[u8])
        -> KexResult<()>;
}
