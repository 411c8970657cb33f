use error::{KexError, KexResult};

/// Values from the version and KEXINIT exchange that enter the
/// exchange hash.
#[derive(Default, Debug, Clone)]
pub struct HashData {
    pub client_id: Option<String>,
    pub server_id: Option<String>,
    /// Complete KEXINIT payloads, message type byte included.
    pub client_kexinit: Option<Vec<u8>>,
    pub server_kexinit: Option<Vec<u8>>,
}

impl HashData {
    pub fn client_id(&self) -> KexResult<&str> {
        self.client_id
            .as_ref()
            .map(|s| s.as_str())
            .ok_or_else(|| KexError::fatal("client version string missing"))
    }

    pub fn server_id(&self) -> KexResult<&str> {
        self.server_id
            .as_ref()
            .map(|s| s.as_str())
            .ok_or_else(|| KexError::fatal("server version string missing"))
    }

    pub fn client_kexinit(&self) -> KexResult<&[u8]> {
        self.client_kexinit
            .as_ref()
            .map(|v| v.as_slice())
            .ok_or_else(|| KexError::fatal("client KEXINIT missing"))
    }

    pub fn server_kexinit(&self) -> KexResult<&[u8]> {
        self.server_kexinit
            .as_ref()
            .map(|v| v.as_slice())
            .ok_or_else(|| KexError::fatal("server KEXINIT missing"))
    }
}

/// Key exchange state of one connection.
///
/// The negotiated method, KEXINIT payloads and key size are refreshed by
/// the layer above before every (re)key. The session identifier is taken
/// from the first exchange and never changes afterwards.
#[derive(Debug, Default)]
pub struct KexSession {
    pub method: String,
    pub hash_data: HashData,
    /// Bits of key material the exchange has to supply.
    pub key_bits: u32,
    session_id: Option<Vec<u8>>,
}

impl KexSession {
    pub fn new(method: &str, key_bits: u32) -> KexSession {
        KexSession {
            method: method.to_owned(),
            hash_data: HashData::default(),
            key_bits: key_bits,
            session_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&[u8]> {
        self.session_id.as_ref().map(|id| id.as_slice())
    }

    /// Store `hash` as the session identifier unless one is set already.
    pub fn set_session_id(&mut self, hash: &[u8]) {
        if self.session_id.is_none() {
            debug!("Session id set from first exchange");
            self.session_id = Some(hash.to_vec());
        }
    }
}
