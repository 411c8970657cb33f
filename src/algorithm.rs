use std::fmt;
use std::str::FromStr;

use gss::Oid;
use key_exchange::HashAlgorithm;

/// Slice of implemented GSSAPI key exchange algorithms, ordered by preference
pub static KEY_EXCHANGE: &[GssKexAlgorithm] = &[
    GssKexAlgorithm::GSS_GEX_SHA1,
    GssKexAlgorithm::GSS_GROUP1_SHA1,
];

/// How the Diffie-Hellman group of an exchange is obtained.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GroupMode {
    /// Compiled-in group, no negotiation.
    Fixed,
    /// Group chosen by the server from a client size request.
    GroupExchange,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(non_camel_case_types)]
pub enum GssKexAlgorithm {
    GSS_GROUP1_SHA1,
    GSS_GEX_SHA1,
}

impl GssKexAlgorithm {
    /// Method name prefix; the mechanism hash follows it directly.
    pub fn prefix(&self) -> &'static str {
        use self::GssKexAlgorithm::*;
        match self
        {
            &GSS_GROUP1_SHA1 => "gss-group1-sha1-",
            &GSS_GEX_SHA1 => "gss-gex-sha1-",
        }
    }

    pub fn group_mode(&self) -> GroupMode {
        match self
        {
            &GssKexAlgorithm::GSS_GROUP1_SHA1 => GroupMode::Fixed,
            &GssKexAlgorithm::GSS_GEX_SHA1 => GroupMode::GroupExchange,
        }
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha1
    }

    pub fn method_name(&self, mech: &Oid) -> String {
        format!("{}{}", self.prefix(), mech.kex_hash())
    }
}

impl FromStr for GssKexAlgorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<GssKexAlgorithm, ()> {
        KEY_EXCHANGE
            .iter()
            .find(|a| s.starts_with(a.prefix()))
            .cloned()
            .ok_or_else(|| {
                debug!("Unknown gss kex algorithm: {}", s);
            })
    }
}

impl fmt::Display for GssKexAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Every method name for every mechanism, for advertising in KEXINIT.
pub fn kex_method_names(mechs: &[Oid]) -> Vec<String> {
    let mut names = Vec::new();
    for mech in mechs.iter() {
        for algorithm in KEY_EXCHANGE.iter() {
            names.push(algorithm.method_name(mech));
        }
    }
    names
}

/// Map a negotiated method name back to its algorithm and mechanism.
pub fn identify(name: &str, mechs: &[Oid]) -> Option<(GssKexAlgorithm, Oid)> {
    let algorithm = GssKexAlgorithm::from_str(name).ok()?;
    let suffix = &name[algorithm.prefix().len()..];

    mechs
        .iter()
        .find(|mech| mech.kex_hash() == suffix)
        .map(|mech| (algorithm, mech.clone()))
}
