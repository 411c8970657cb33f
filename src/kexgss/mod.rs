//! GSSAPI authenticated Diffie-Hellman key exchange (RFC 4462).
//!
//! The exchange is authenticated by a GSSAPI security context instead of a
//! host key signature: while the context is being established the client's
//! DH value rides along with the first token, and the server proves
//! knowledge of the exchange hash with a MIC in its final message.

mod client;
mod messages;
mod server;
pub mod token_loop;

pub use self::client::run_client_exchange;
pub use self::messages::*;
pub use self::server::run_server_exchange;

use zeroize::Zeroizing;

use connection::Connection;
use error::{KexError, KexResult};
use gss::SecurityContext;
use key_exchange::{ExchangeResult, KeyDerivation, SharedSecret};
use message::MessageType;
use transport::Transport;

/// Wait for the next KEXGSS message, accepting only the `allowed` ids.
/// SSH_MSG_IGNORE and SSH_MSG_DEBUG are skipped.
fn read_message(transport: &mut dyn Transport, allowed: &[u8])
    -> KexResult<GssMessage> {
    loop {
        let packet = transport.recv()?;
        match packet.msg_type()
        {
            MessageType::Ignore | MessageType::Debug => {
                trace!("Skipping {:?} during key exchange", packet);
            }
            MessageType::KeyExchange(id) if allowed.contains(&id) => {
                return GssMessage::from_packet(&packet);
            }
            other => {
                return Err(KexError::protocol(
                    format!("didn't expect packet type {:?}", other),
                ))
            }
        }
    }
}

/// Turn a message the caller has no use for into an error. An
/// SSH_MSG_KEXGSS_ERROR carries the peer's GSSAPI status.
fn unexpected(message: GssMessage) -> KexError {
    match message
    {
        GssMessage::Error {
            major,
            minor,
            message,
            language,
        } => {
            debug!("Received KEXGSS_ERROR");
            KexError::PeerError {
                major: major,
                minor: minor,
                message: message,
                language: language,
            }
        }
        other => KexError::protocol(format!("didn't expect message {}", other.id())),
    }
}

fn send_message(transport: &mut dyn Transport, message: &GssMessage)
    -> KexResult<()> {
    transport.send(message.to_packet())?;
    Ok(())
}

/// Record the session id and hand the exchange result to key derivation.
/// The context is cached only once derivation has succeeded.
fn finish<T: Transport>(
    conn: &mut Connection<T>,
    ctx: Box<dyn SecurityContext>,
    exchange_hash: Zeroizing<Vec<u8>>,
    shared_secret: SharedSecret,
    kdf: &mut dyn KeyDerivation,
) -> KexResult<()> {
    conn.session.set_session_id(&exchange_hash);
    let session_id = match conn.session.session_id()
    {
        Some(id) => id.to_vec(),
        None => return Err(KexError::fatal("session id missing")),
    };

    kdf.derive(
        ExchangeResult {
            exchange_hash: exchange_hash,
            shared_secret: shared_secret,
        },
        &session_id,
    )?;

    conn.park_context(ctx);
    Ok(())
}
