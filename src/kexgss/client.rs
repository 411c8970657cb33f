use num_bigint::BigUint;

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

/// Client side of the token loop. The first token travels in
/// SSH_MSG_KEXGSS_INIT together with `e`, later ones in CONTINUE.
struct ClientTokens<'a> {
    transport: &'a mut dyn Transport,
    public: &'a BigUint,
    sent_init: bool,
    /// A CONTINUE or COMPLETE has arrived; HOSTKEY is no longer allowed.
    replied: bool,
    host_key: Option<Vec<u8>>,
    /// `f` and the MIC from SSH_MSG_KEXGSS_COMPLETE.
    complete: Option<(BigUint, Vec<u8>)>,
}

impl<'a> ClientTokens<'a> {
    fn send_token(&mut self, token: Vec<u8>) -> KexResult<()> {
        let message = if !self.sent_init {
            self.sent_init = true;
            GssMessage::Init {
                token: token,
                e: self.public.clone(),
            }
        }
        else {
            GssMessage::Continue { token: token }
        };
        send_message(&mut *self.transport, &message)
    }
}

impl<'a> TokenIo for ClientTokens<'a> {
    fn deliver(&mut self, token: Vec<u8>, complete: bool)
        -> KexResult<Option<Vec<u8>>> {
        if token.is_empty() {
            return Ok(None);
        }

        // If we have data to send, the last message we received cannot
        // have been a COMPLETE
        if self.complete.is_some() {
            return Err(KexError::protocol("token to send after COMPLETE"));
        }

        self.send_token(token)?;

        loop {
            let allowed: &[u8] = if self.replied {
                &[KEXGSS_CONTINUE, KEXGSS_COMPLETE, KEXGSS_ERROR]
            }
            else {
                &[KEXGSS_HOSTKEY, KEXGSS_CONTINUE, KEXGSS_COMPLETE, KEXGSS_ERROR]
            };

            match read_message(&mut *self.transport, allowed)?
            {
                GssMessage::HostKey { key } => {
                    debug!("Received KEXGSS_HOSTKEY");
                    if self.host_key.is_some() {
                        return Err(KexError::protocol(
                            "server host key received more than once",
                        ));
                    }
                    self.host_key = Some(key);
                }
                GssMessage::Continue { token } => {
                    debug!("Received KEXGSS_CONTINUE");
                    self.replied = true;
                    if complete {
                        return Err(KexError::protocol(
                            "GSSAPI continue received from server when complete",
                        ));
                    }
                    return Ok(Some(token));
                }
                GssMessage::Complete { f, mic, token } => {
                    debug!("Received KEXGSS_COMPLETE");
                    self.replied = true;
                    self.complete = Some((f, mic));
                    return match token
                    {
                        Some(token) => {
                            if complete {
                                Err(KexError::protocol("received token when complete"))
                            }
                            else {
                                Ok(Some(token))
                            }
                        }
                        None => {
                            if !complete {
                                Err(KexError::protocol("did not receive final token"))
                            }
                            else {
                                Ok(None)
                            }
                        }
                    };
                }
                other => return Err(unexpected(other)),
            }
        }
    }

    fn abort(&mut self, token: Vec<u8>) -> KexResult<()> {
        send_message(&mut *self.transport, &GssMessage::Continue { token: token })
    }
}

/// Run the initiator side of the exchange on `conn`, which must be a
/// client connection. On success `kdf` has been fed the exchange hash
/// and shared secret.
pub fn run_client_exchange<T: Transport>(
    conn: &mut Connection<T>,
    kdf: &mut dyn KeyDerivation,
) -> KexResult<()> {
    let config = match conn.conn_type
    {
        ConnectionType::Client(ref config) => config.clone(),
        _ => return Err(KexError::fatal("client exchange on a server connection")),
    };

    let (algorithm, mech) = config
        .provider
        .mechanism_for_method(&conn.session.method)
        .ok_or_else(|| KexError::fatal("couldn't identify host exchange"))?;
    debug!("Client key exchange {} with mechanism {}", algorithm, mech);

    let target = config
        .provider
        .import_name(&config.gss_host)
        .map_err(|err| KexError::fatal(format!("couldn't import hostname: {}", err)))?;
    let mut ctx: Box<dyn SecurityContext> =
        config.provider.initiator(&mech, &target, config.delegate_credentials)?;

    let (group, request) = match algorithm.group_mode()
    {
        GroupMode::Fixed => (DhGroup::group1(), None),
        GroupMode::GroupExchange => {
            debug!("Doing group exchange");
            let request = GroupRequest::for_key_bits(
                conn.session.key_bits,
                config.group_min,
                config.group_max,
            );
            send_message(
                &mut conn.transport,
                &GssMessage::GroupRequest {
                    min: request.min,
                    n: request.n,
                    max: request.max,
                },
            )?;

            let group =
                match read_message(&mut conn.transport, &[KEXGSS_GROUP, KEXGSS_ERROR])?
                {
                    GssMessage::Group { p, g } => DhGroup::new(p, g),
                    other => return Err(unexpected(other)),
                };

            if !request.accepts(&group) {
                return Err(KexError::protocol(format!(
                    "GSSGRP_GEX group out of range: {} !< {} !< {}",
                    request.min,
                    group.bits(),
                    request.max
                )));
            }
            (group, Some(request))
        }
    };

    let keys = DhKeyPair::generate(&group, conn.session.key_bits)?;

    let (host_key, complete) = {
        let mut tokens = ClientTokens {
            transport: &mut conn.transport,
            public: &keys.public,
            sent_init: false,
            replied: false,
            host_key: None,
            complete: None,
        };
        token_loop::run(&mut *ctx, None, &mut tokens)?;
        (tokens.host_key, tokens.complete)
    };

    // We must have received a COMPLETE, carrying f and the MIC
    let (server_public, mic) = complete.ok_or_else(|| {
        KexError::fatal("didn't receive a KEXGSS_COMPLETE when expected")
    })?;

    if !group.is_valid_public(&server_public) {
        return Err(KexError::protocol("bad server public DH value"));
    }

    let shared_secret = keys.compute_shared(&group, &server_public)?;

    let hash = {
        let data = &conn.session.hash_data;
        let transcript = Transcript {
            client_version: data.client_id()?,
            server_version: data.server_id()?,
            client_kexinit: data.client_kexinit()?,
            server_kexinit: data.server_kexinit()?,
            host_key: host_key.as_ref().map(|k| k.as_slice()).unwrap_or(&[]),
            group: request.map(|request| {
                ExchangeGroup {
                    request: request,
                    group: &group,
                }
            }),
            client_public: &keys.public,
            server_public: &server_public,
            shared_secret: &shared_secret,
        };
        transcript.hash(algorithm.hash_algorithm())
    };

    if let Err(err) = ctx.verify_mic(&hash, &mic) {
        debug!("MIC verification failed: {}", err);
        return Err(KexError::protocol("hash's MIC didn't verify"));
    }

    finish(conn, ctx, hash, shared_secret, kdf)
}
