use error::{KexError, KexResult};
use gss::{ContextFlags, ContextStatus, SecurityContext};

/// Role-specific side of the token loop: how tokens reach the peer and
/// how the peer's tokens come back.
pub trait TokenIo {
    /// Hand over a token the local context produced (possibly empty) and
    /// return the peer's next token, or `None` if no further token will
    /// arrive.
    fn deliver(&mut self, token: Vec<u8>, complete: bool)
        -> KexResult<Option<Vec<u8>>>;

    /// Last-gasp delivery of the partial token of a failed context.
    fn abort(&mut self, token: Vec<u8>) -> KexResult<()>;
}

/// Advance `ctx` until it is complete, feeding it `first` and then every
/// token the peer returns. Returns the flags negotiated by the context.
///
/// A completed context must offer mutual authentication and integrity
/// protection, otherwise the exchange cannot be trusted.
pub fn run(
    ctx: &mut dyn SecurityContext,
    first: Option<Vec<u8>>,
    io: &mut dyn TokenIo,
) -> KexResult<ContextFlags> {
    let mut input = first;
    let mut rounds = 0usize;

    loop {
        let step = match ctx.step(input.as_ref().map(|t| t.as_slice()))
        {
            Ok(step) => step,
            Err(mut err) => {
                let token = ::std::mem::replace(&mut err.token, Vec::new());
                if !token.is_empty() {
                    if let Err(send_err) = io.abort(token) {
                        warn!("Could not send final context token: {}", send_err);
                    }
                }
                return Err(KexError::ContextError(err));
            }
        };
        rounds += 1;

        let complete = step.status == ContextStatus::Complete;
        if complete {
            if !step.flags.contains(ContextFlags::MUTUAL) {
                return Err(KexError::fatal("mutual authentication failed"));
            }
            if !step.flags.contains(ContextFlags::INTEG) {
                return Err(KexError::fatal("integrity check failed"));
            }
        }

        trace!(
            "Context step {}: {:?}, {} byte token",
            rounds,
            step.status,
            step.token.len()
        );

        match io.deliver(step.token, complete)?
        {
            Some(token) => {
                if complete {
                    return Err(KexError::protocol(
                        "received token when complete",
                    ));
                }
                input = Some(token);
            }
            None => {
                if !complete {
                    return Err(KexError::fatal("not complete, and no token output"));
                }
                debug!("Security context complete after {} steps", rounds);
                return Ok(step.flags);
            }
        }
    }
}
