use std::sync::Arc;

use config::{ClientConfig, ServerConfig};
use error::{KexError, KexResult};
use gss::SecurityContext;
use kexgss;
use key_exchange::KeyDerivation;
use session::KexSession;
use transport::{Transport, SSH_DISCONNECT_PROTOCOL_ERROR};

#[derive(Clone)]
pub enum ConnectionType {
    Client(Arc<ClientConfig>),
    Server(Arc<ServerConfig>),
}

pub struct Connection<T: Transport> {
    pub conn_type: ConnectionType,
    pub session: KexSession,
    pub(crate) transport: T,
    gss_context: Option<Box<dyn SecurityContext>>,
}

impl<T: Transport> Connection<T> {
    pub fn new(conn_type: ConnectionType, transport: T, session: KexSession)
        -> Connection<T> {
        Connection {
            conn_type: conn_type,
            session: session,
            transport: transport,
            gss_context: None,
        }
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run one GSSAPI key exchange in this connection's role. On failure
    /// the connection is torn down before the error is returned.
    pub fn key_exchange(&mut self, kdf: &mut dyn KeyDerivation) -> KexResult<()> {
        let result = match self.conn_type
        {
            ConnectionType::Client(_) => kexgss::run_client_exchange(self, kdf),
            ConnectionType::Server(_) => kexgss::run_server_exchange(self, kdf),
        };

        if let Err(ref err) = result {
            error!("{}", err);
            match err
            {
                &KexError::ProtocolError(ref reason) => {
                    let reason = format!("Protocol error: {}", reason);
                    if let Err(io_err) =
                        self.transport.disconnect(SSH_DISCONNECT_PROTOCOL_ERROR, &reason)
                    {
                        debug!("Could not send disconnect: {}", io_err);
                    }
                }
                _ => self.transport.close(),
            }
        }

        result
    }

    /// Context of the first completed exchange, kept for later use by
    /// gssapi-keyex user authentication.
    pub fn gss_context(&mut self) -> Option<&mut (dyn SecurityContext + 'static)> {
        match self.gss_context
        {
            Some(ref mut ctx) => Some(&mut **ctx),
            None => None,
        }
    }

    pub fn has_gss_context(&self) -> bool {
        self.gss_context.is_some()
    }

    /// Keep `ctx` unless a context is cached already, in which case the
    /// new one is dropped.
    pub(crate) fn park_context(&mut self, ctx: Box<dyn SecurityContext>) {
        if self.gss_context.is_none() {
            debug!("Caching security context");
            self.gss_context = Some(ctx);
        }
        else {
            debug!("Security context already cached, releasing new one");
        }
    }
}
