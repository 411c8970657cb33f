use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use num_bigint::BigUint;
use rand::{self, seq::SliceRandom};

/// Smallest modulus the group exchange accepts by default.
pub const DH_GRP_MIN: u32 = 1024;
/// Largest modulus the group exchange accepts by default.
pub const DH_GRP_MAX: u32 = 8192;

const MODULI_TYPE_SAFE: u32 = 2;
const MODULI_TESTS_COMPOSITE: u32 = 0x01;

/// Second Oakley Group
/// Source: https://tools.ietf.org/html/rfc2409#section-6.2
#[cfg_attr(rustfmt, rustfmt_skip)]
static OAKLEY_GROUP_2: &[u32] = &[
    0xFFFFFFFF, 0xFFFFFFFF, 0xC90FDAA2, 0x2168C234, 0xC4C6628B, 0x80DC1CD1,
    0x29024E08, 0x8A67CC74, 0x020BBEA6, 0x3B139B22, 0x514A0879, 0x8E3404DD,
    0xEF9519B3, 0xCD3A431B, 0x302B0A6D, 0xF25F1437, 0x4FE1356D, 0x6D51C245,
    0xE485B576, 0x625E7EC6, 0xF44C42E9, 0xA637ED6B, 0x0BFF5CB6, 0xF406B7ED,
    0xEE386BFB, 0x5A899FA5, 0xAE9F2411, 0x7C4B1FE6, 0x49286651, 0xECE65381,
    0xFFFFFFFF, 0xFFFFFFFF
];

/// Diffie-Hellman modulus and generator.
#[derive(Clone, PartialEq, Debug)]
pub struct DhGroup {
    pub p: BigUint,
    pub g: BigUint,
}

impl DhGroup {
    pub fn new(p: BigUint, g: BigUint) -> DhGroup {
        DhGroup { p: p, g: g }
    }

    /// The fixed "group1" of the SSH key exchange (Oakley group 2).
    pub fn group1() -> DhGroup {
        let mut digits = OAKLEY_GROUP_2.to_vec();
        digits.reverse();
        DhGroup {
            p: BigUint::new(digits),
            g: BigUint::from(2u32),
        }
    }

    pub fn bits(&self) -> u64 {
        self.p.bits()
    }

    /// Range check for a received public value: 2 <= value <= p - 2.
    pub fn is_valid_public(&self, value: &BigUint) -> bool {
        let two = BigUint::from(2u32);
        if self.p <= two {
            return false;
        }
        *value >= two && *value <= &self.p - &two
    }
}

/// Size request sent by a group exchange client.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GroupRequest {
    pub min: u32,
    pub n: u32,
    pub max: u32,
}

impl GroupRequest {
    /// Request for a group strong enough for `key_bits` of key material,
    /// bounded by the client's limits.
    pub fn for_key_bits(key_bits: u32, min: u32, max: u32) -> GroupRequest {
        let n = dh_estimate(key_bits);
        GroupRequest {
            min: min,
            n: n.max(min).min(max),
            max: max,
        }
    }

    /// Clamp into the server's limits. Fails if the request is inconsistent
    /// afterwards.
    pub fn clamp(&self, grp_min: u32, grp_max: u32) -> Option<GroupRequest> {
        let min = self.min.max(grp_min);
        let max = self.max.min(grp_max);

        if max < min || self.n < min || max < self.n {
            None
        }
        else {
            Some(GroupRequest {
                min: min,
                n: self.n,
                max: max,
            })
        }
    }

    pub fn accepts(&self, group: &DhGroup) -> bool {
        let bits = group.bits();
        bits >= self.min as u64 && bits <= self.max as u64
    }
}

/// Modulus size giving roughly `bits` of security.
pub fn dh_estimate(bits: u32) -> u32 {
    if bits <= 128 {
        1024
    }
    else if bits <= 192 {
        2048
    }
    else {
        4096
    }
}

/// Groups a server can offer during group exchange.
#[derive(Clone, Default, Debug)]
pub struct GroupTable {
    groups: Vec<DhGroup>,
}

impl GroupTable {
    pub fn new() -> GroupTable {
        GroupTable { groups: Vec::new() }
    }

    pub fn add(&mut self, group: DhGroup) {
        self.groups.push(group);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<GroupTable> {
        let file = File::open(path)?;
        GroupTable::parse(BufReader::new(file))
    }

    /// Parse the OpenSSH moduli format, skipping unusable lines.
    pub fn parse<R: BufRead>(reader: R) -> io::Result<GroupTable> {
        let mut table = GroupTable::new();

        for (num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_moduli_line(line) {
                Some(group) => table.add(group),
                None => debug!("moduli:{}: skipping bad prime description", num + 1),
            }
        }

        Ok(table)
    }

    /// Pick the group closest to `request.n` within `[min, max]`: the
    /// smallest size at or above `n`, else the largest below it.
    pub fn choose(&self, request: &GroupRequest) -> Option<DhGroup> {
        let candidates: Vec<&DhGroup> =
            self.groups.iter().filter(|g| request.accepts(g)).collect();

        let n = request.n as u64;
        let best = candidates
            .iter()
            .map(|g| g.bits())
            .filter(|&bits| bits >= n)
            .min()
            .or_else(|| candidates.iter().map(|g| g.bits()).max());

        let best = match best
        {
            Some(bits) => bits,
            None => {
                let fallback = DhGroup::group1();
                if request.accepts(&fallback) {
                    debug!("No suitable moduli, falling back to group1");
                    return Some(fallback);
                }
                return None;
            }
        };

        let same_size: Vec<&&DhGroup> =
            candidates.iter().filter(|g| g.bits() == best).collect();
        let mut rng = rand::thread_rng();
        same_size.choose(&mut rng).map(|g| (***g).clone())
    }
}

fn parse_moduli_line(line: &str) -> Option<DhGroup> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 7 {
        return None;
    }

    let kind: u32 = fields[1].parse().ok()?;
    let tests: u32 = fields[2].parse().ok()?;
    let size: u64 = fields[4].parse().ok()?;
    let generator: u32 = fields[5].parse().ok()?;

    if kind != MODULI_TYPE_SAFE {
        return None;
    }
    if tests & MODULI_TESTS_COMPOSITE != 0 || tests & !MODULI_TESTS_COMPOSITE == 0 {
        return None;
    }
    if generator < 2 {
        return None;
    }

    let p = BigUint::parse_bytes(fields[6].as_bytes(), 16)?;

    // The size field counts one bit less than the modulus has
    if p.bits() != size + 1 {
        return None;
    }

    Some(DhGroup::new(p, BigUint::from(generator)))
}
