use std::sync::Arc;

use gss::GssProvider;
use key_exchange::{GroupTable, DH_GRP_MAX, DH_GRP_MIN};

pub struct ClientConfig {
    pub provider: Arc<dyn GssProvider>,
    /// Host the server's acceptor name is derived from.
    pub gss_host: String,
    pub delegate_credentials: bool,
    pub group_min: u32,
    pub group_max: u32,
}

impl ClientConfig {
    pub fn new(provider: Arc<dyn GssProvider>, gss_host: &str) -> ClientConfig {
        ClientConfig {
            provider: provider,
            gss_host: gss_host.to_owned(),
            delegate_credentials: false,
            group_min: DH_GRP_MIN,
            group_max: DH_GRP_MAX,
        }
    }
}

pub struct ServerConfig {
    pub provider: Arc<dyn GssProvider>,
    pub group_min: u32,
    pub group_max: u32,
    /// Groups offered during group exchange.
    pub moduli: GroupTable,
    /// Host key blob announced with SSH_MSG_KEXGSS_HOSTKEY.
    pub host_key: Option<Vec<u8>>,
}

impl ServerConfig {
    pub fn new(provider: Arc<dyn GssProvider>) -> ServerConfig {
        ServerConfig {
            provider: provider,
            group_min: DH_GRP_MIN,
            group_max: DH_GRP_MAX,
            moduli: GroupTable::new(),
            host_key: None,
        }
    }
}
