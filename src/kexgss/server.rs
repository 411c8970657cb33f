use algorithm::GroupMode;
use connection::{Connection, ConnectionType};
use error::{KexError, KexResult};
use gss::SecurityContext;
use kexgss::messages::*;
use kexgss::token_loop::{self, TokenIo};
use kexgss::{finish, read_message, send_message, unexpected};
use key_exchange::{DhGroup, DhKeyPair, ExchangeGroup, GroupRequest,
                   KeyDerivation, Transcript};
use transport::Transport;

/// Server side of the token loop. Every token the context produces while
/// it still needs more goes out as SSH_MSG_KEXGSS_CONTINUE; the token of
/// the completing step is kept for SSH_MSG_KEXGSS_COMPLETE.
struct ServerTokens<'a> {
    transport: &'a mut dyn Transport,
    final_token: Vec<u8>,
}

impl<'a> TokenIo for ServerTokens<'a> {
    fn deliver(&mut self, token: Vec<u8>, complete: bool)
        -> KexResult<Option<Vec<u8>>> {
        if complete {
            self.final_token = token;
            return Ok(None);
        }

        if token.is_empty() {
            return Err(KexError::fatal("zero length token output when incomplete"));
        }

        debug!("Sending KEXGSS_CONTINUE");
        send_message(&mut *self.transport, &GssMessage::Continue { token: token })?;

        match read_message(&mut *self.transport, &[KEXGSS_CONTINUE, KEXGSS_INIT])?
        {
            GssMessage::Continue { token } => Ok(Some(token)),
            GssMessage::Init { .. } => {
                Err(KexError::fatal("received KEXGSS_INIT after initialising"))
            }
            other => Err(unexpected(other)),
        }
    }

    fn abort(&mut self, token: Vec<u8>) -> KexResult<()> {
        send_message(&mut *self.transport, &GssMessage::Continue { token: token })
    }
}

/// Run the acceptor side of the exchange on `conn`, which must be a
/// server connection.
pub fn run_server_exchange<T: Transport>(
    conn: &mut Connection<T>,
    kdf: &mut dyn KeyDerivation,
) -> KexResult<()> {
    let config = match conn.conn_type
    {
        ConnectionType::Server(ref config) => config.clone(),
        _ => return Err(KexError::fatal("server exchange on a client connection")),
    };

    debug!("Identifying {}", conn.session.method);
    let (algorithm, mech) = config
        .provider
        .mechanism_for_method(&conn.session.method)
        .ok_or_else(|| KexError::fatal("unknown gssapi mechanism"))?;

    debug!("Acquiring credentials for {}", mech);
    let mut ctx: Box<dyn SecurityContext> =
        config.provider.acceptor(&mech).map_err(|err| {
            KexError::fatal(format!(
                "unable to acquire credentials for the server: {}",
                err
            ))
        })?;

    let (group, request) = match algorithm.group_mode()
    {
        GroupMode::Fixed => (DhGroup::group1(), None),
        GroupMode::GroupExchange => {
            debug!("Doing group exchange");
            let request =
                match read_message(&mut conn.transport, &[KEXGSS_GROUPREQ, KEXGSS_ERROR])?
                {
                    GssMessage::GroupRequest { min, n, max } => GroupRequest {
                        min: min,
                        n: n,
                        max: max,
                    },
                    other => return Err(unexpected(other)),
                };

            let clamped = request
                .clamp(config.group_min, config.group_max)
                .ok_or_else(|| {
                    KexError::protocol(format!(
                        "GSS_GEX, bad parameters: {} !< {} !< {}",
                        request.min,
                        request.n,
                        request.max
                    ))
                })?;

            let group = config
                .moduli
                .choose(&clamped)
                .ok_or_else(|| KexError::protocol("no matching group found"))?;
            debug!("Selected {} bit group", group.bits());

            send_message(
                &mut conn.transport,
                &GssMessage::Group {
                    p: group.p.clone(),
                    g: group.g.clone(),
                },
            )?;
            (group, Some(request))
        }
    };

    let keys = DhKeyPair::generate(&group, conn.session.key_bits)?;

    debug!("Wait KEXGSS_INIT");
    let (first_token, client_public) =
        match read_message(&mut conn.transport, &[KEXGSS_INIT])?
        {
            GssMessage::Init { token, e } => (token, e),
            _ => return Err(KexError::protocol("expected KEXGSS_INIT")),
        };

    if let Some(ref key) = config.host_key {
        send_message(
            &mut conn.transport,
            &GssMessage::HostKey { key: key.clone() },
        )?;
    }

    let final_token = {
        let mut tokens = ServerTokens {
            transport: &mut conn.transport,
            final_token: Vec::new(),
        };
        token_loop::run(&mut *ctx, Some(first_token), &mut tokens)?;
        tokens.final_token
    };

    if !group.is_valid_public(&client_public) {
        return Err(KexError::protocol("bad client public DH value"));
    }

    let shared_secret = keys.compute_shared(&group, &client_public)?;

    let hash = {
        let data = &conn.session.hash_data;
        let host_key: &[u8] = match config.host_key
        {
            Some(ref key) => key.as_slice(),
            None => &[],
        };
        let transcript = Transcript {
            client_version: data.client_id()?,
            server_version: data.server_id()?,
            client_kexinit: data.client_kexinit()?,
            server_kexinit: data.server_kexinit()?,
            host_key: host_key,
            group: request.map(|request| {
                ExchangeGroup {
                    request: request,
                    group: &group,
                }
            }),
            client_public: &client_public,
            server_public: &keys.public,
            shared_secret: &shared_secret,
        };
        transcript.hash(algorithm.hash_algorithm())
    };

    conn.session.set_session_id(&hash);

    let mic = ctx
        .sign(&hash)
        .map_err(|err| KexError::fatal(format!("couldn't get MIC: {}", err)))?;

    send_message(
        &mut conn.transport,
        &GssMessage::Complete {
            f: keys.public.clone(),
            mic: mic,
            token: if final_token.is_empty() {
                None
            }
            else {
                Some(final_token)
            },
        },
    )?;

    finish(conn, ctx, hash, shared_secret, kdf)
}
