#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use kexgss::algorithm::GssKexAlgorithm;
use kexgss::gss::{ContextFlags, ContextStatus, ContextStep, GssError,
                  GssProvider, Oid, PeerName, SecurityContext};
use kexgss::kexgss::GssMessage;
use kexgss::key_exchange::{ExchangeResult, HashAlgorithm, KeyDerivation};
use kexgss::message::MessageType;
use kexgss::packet::{Packet, WritePacketExt};
use kexgss::{ClientConfig, Connection, ConnectionType, KexResult, KexSession,
             ServerConfig, Transport};

/// A 127 bit modulus (2^127 - 1) with generator 3, small enough to keep
/// group exchange tests quick.
pub const SMALL_MODULI: &str =
    "20200101000000 2 6 100 126 3 7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\n";

pub const CLIENT_VERSION: &str = "SSH-2.0-kexgss_test_client";
pub const SERVER_VERSION: &str = "SSH-2.0-kexgss_test_server";

#[derive(Clone, Debug)]
pub enum Reply {
    Continue(&'static str),
    Complete(&'static str),
    /// Fail, handing out a partial token.
    Fail(&'static str),
}

/// One call of a scripted context: the token it expects and what it
/// answers.
#[derive(Clone, Debug)]
pub struct Step {
    pub expect: Option<&'static str>,
    pub reply: Reply,
}

pub fn step(expect: Option<&'static str>, reply: Reply) -> Step {
    Step {
        expect: expect,
        reply: reply,
    }
}

/// Security context following a fixed script. MICs are a SHA-1 over a
/// shared key and the data, followed by the context's serial number.
pub struct StubContext {
    script: VecDeque<Step>,
    flags: ContextFlags,
    mic_key: Vec<u8>,
    serial: u8,
}

impl StubContext {
    pub fn new(script: Vec<Step>, flags: ContextFlags) -> StubContext {
        StubContext {
            script: script.into_iter().collect(),
            flags: flags,
            mic_key: b"stub".to_vec(),
            serial: 0,
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut buf = self.mic_key.clone();
        buf.extend_from_slice(data);
        HashAlgorithm::Sha1.hash(&buf)
    }
}

impl SecurityContext for StubContext {
    fn step(&mut self, token: Option<&[u8]>) -> Result<ContextStep, GssError> {
        let step = match self.script.pop_front()
        {
            Some(step) => step,
            None => return Err(GssError::new("script exhausted")),
        };

        if step.expect.map(|t| t.as_bytes()) != token {
            return Err(GssError::new(format!(
                "expected token {:?}, got {:?}",
                step.expect,
                token
            )));
        }

        let (status, token) = match step.reply
        {
            Reply::Continue(token) => (ContextStatus::ContinueNeeded, token),
            Reply::Complete(token) => (ContextStatus::Complete, token),
            Reply::Fail(token) => {
                let mut err = GssError::new("scripted failure");
                err.token = token.as_bytes().to_vec();
                return Err(err);
            }
        };

        Ok(ContextStep {
            status: status,
            token: token.as_bytes().to_vec(),
            flags: self.flags,
        })
    }

    fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>, GssError> {
        let mut mic = self.digest(data);
        mic.push(self.serial);
        Ok(mic)
    }

    fn verify_mic(&mut self, data: &[u8], mic: &[u8]) -> Result<(), GssError> {
        let expected = self.digest(data);
        if mic.len() == expected.len() + 1 && mic[..expected.len()] == expected[..] {
            Ok(())
        }
        else {
            Err(GssError::new("bad MIC"))
        }
    }
}

/// Provider handing out scripted contexts for the Kerberos OID. Each new
/// context gets the next serial number.
pub struct StubProvider {
    pub initiator: Vec<Step>,
    pub acceptor: Vec<Step>,
    pub flags: ContextFlags,
    pub mic_key: Vec<u8>,
    created: AtomicUsize,
}

impl StubProvider {
    pub fn new(initiator: Vec<Step>, acceptor: Vec<Step>) -> StubProvider {
        StubProvider {
            initiator: initiator,
            acceptor: acceptor,
            flags: ContextFlags::MUTUAL | ContextFlags::INTEG,
            mic_key: b"stub".to_vec(),
            created: AtomicUsize::new(0),
        }
    }

    fn context(&self, script: &[Step]) -> Box<dyn SecurityContext> {
        let mut ctx = StubContext::new(script.to_vec(), self.flags);
        ctx.mic_key = self.mic_key.clone();
        ctx.serial = self.created.fetch_add(1, Ordering::SeqCst) as u8;
        Box::new(ctx)
    }
}

impl GssProvider for StubProvider {
    fn mechanisms(&self) -> Vec<Oid> {
        vec![Oid::krb5()]
    }

    fn initiator(
        &self,
        _mech: &Oid,
        target: &PeerName,
        _delegate: bool,
    ) -> Result<Box<dyn SecurityContext>, GssError> {
        assert_eq!(target, &PeerName("host@server.example.org".to_owned()));
        Ok(self.context(&self.initiator))
    }

    fn acceptor(&self, _mech: &Oid) -> Result<Box<dyn SecurityContext>, GssError> {
        Ok(self.context(&self.acceptor))
    }
}

/// Scripts where each side produces a single token.
pub fn one_round() -> (Vec<Step>, Vec<Step>) {
    (
        vec![
            step(None, Reply::Continue("c0")),
            step(Some("s0"), Reply::Complete("")),
        ],
        vec![step(Some("c0"), Reply::Complete("s0"))],
    )
}

/// In-memory transport. Keeps the message ids it sent and how it was torn
/// down.
pub struct ChannelTransport {
    tx: Option<Sender<Vec<u8>>>,
    rx: Receiver<Vec<u8>>,
    pub sent: Vec<u8>,
    pub disconnected: Option<(u32, String)>,
    pub closed: bool,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (tx_a, rx_a) = channel();
        let (tx_b, rx_b) = channel();
        (
            ChannelTransport::new(tx_a, rx_b),
            ChannelTransport::new(tx_b, rx_a),
        )
    }

    fn new(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> ChannelTransport {
        ChannelTransport {
            tx: Some(tx),
            rx: rx,
            sent: Vec::new(),
            disconnected: None,
            closed: false,
        }
    }

    pub fn push(&mut self, message: GssMessage) {
        self.send(message.to_packet()).unwrap();
    }

    /// Packets that have arrived so far, without blocking.
    pub fn drain(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(payload) = self.rx.try_recv() {
            packets.push(Packet::from_payload(payload).unwrap());
        }
        packets
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, packet: Packet) -> io::Result<()> {
        let tx = match self.tx
        {
            Some(ref tx) => tx,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "closed")),
        };
        self.sent.push(packet.payload()[0]);
        tx.send(packet.payload().to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }

    fn recv(&mut self) -> io::Result<Packet> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        let payload = self.rx
            .recv()
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionAborted, "peer gone"))?;
        Packet::from_payload(payload)
    }

    fn disconnect(&mut self, reason: u32, description: &str) -> io::Result<()> {
        let mut packet = Packet::new(MessageType::Disconnect);
        packet.write_uint32(reason)?;
        packet.write_string(description)?;
        packet.write_string("")?;
        let result = self.send(packet);

        self.disconnected = Some((reason, description.to_owned()));
        self.close();
        result
    }

    fn close(&mut self) {
        self.closed = true;
        self.tx = None;
    }
}

pub struct Derived {
    pub exchange_hash: Vec<u8>,
    pub shared_secret: Vec<u8>,
    pub session_id: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingKdf {
    pub calls: Vec<Derived>,
}

impl KeyDerivation for RecordingKdf {
    fn derive(&mut self, result: ExchangeResult, session_id: &[u8]) -> KexResult<()> {
        self.calls.push(Derived {
            exchange_hash: result.exchange_hash.to_vec(),
            shared_secret: result.shared_secret.as_bytes().to_vec(),
            session_id: session_id.to_vec(),
        });
        Ok(())
    }
}

pub fn method(algorithm: GssKexAlgorithm) -> String {
    algorithm.method_name(&Oid::krb5())
}

pub fn session(method: &str, key_bits: u32) -> KexSession {
    let mut session = KexSession::new(method, key_bits);
    session.hash_data.client_id = Some(CLIENT_VERSION.to_owned());
    session.hash_data.server_id = Some(SERVER_VERSION.to_owned());
    session.hash_data.client_kexinit = Some(vec![20, 1, 2, 3, 4]);
    session.hash_data.server_kexinit = Some(vec![20, 5, 6, 7, 8]);
    session
}

pub fn client_config(provider: Arc<StubProvider>) -> ClientConfig {
    ClientConfig::new(provider, "server.example.org")
}

pub fn server_config(provider: Arc<StubProvider>) -> ServerConfig {
    ServerConfig::new(provider)
}

pub fn client_connection(config: ClientConfig, transport: ChannelTransport,
                         method: &str, key_bits: u32)
    -> Connection<ChannelTransport> {
    Connection::new(
        ConnectionType::Client(Arc::new(config)),
        transport,
        session(method, key_bits),
    )
}

pub fn server_connection(config: ServerConfig, transport: ChannelTransport,
                         method: &str, key_bits: u32)
    -> Connection<ChannelTransport> {
    Connection::new(
        ConnectionType::Server(Arc::new(config)),
        transport,
        session(method, key_bits),
    )
}

/// What one side of an exchange ended up with.
pub struct Side {
    pub results: Vec<KexResult<()>>,
    pub kdf: RecordingKdf,
    pub transport: ChannelTransport,
    pub session_id: Option<Vec<u8>>,
    /// Serial number of the cached security context.
    pub cached_serial: Option<u8>,
}

impl Side {
    pub fn ok(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }

    pub fn error(&self) -> String {
        match self.results.iter().find(|r| r.is_err())
        {
            Some(&Err(ref err)) => err.to_string(),
            _ => String::new(),
        }
    }
}

fn run_side(mut conn: Connection<ChannelTransport>, rounds: usize) -> Side {
    let mut kdf = RecordingKdf::default();
    let mut results = Vec::new();

    for _ in 0..rounds {
        let result = conn.key_exchange(&mut kdf);
        let failed = result.is_err();
        results.push(result);
        if failed {
            break;
        }
    }

    let session_id = conn.session.session_id().map(|id| id.to_vec());
    let cached_serial = conn.gss_context()
        .and_then(|ctx| ctx.sign(b"serial").ok())
        .and_then(|mic| mic.last().cloned());

    Side {
        results: results,
        kdf: kdf,
        transport: conn.into_transport(),
        session_id: session_id,
        cached_serial: cached_serial,
    }
}

/// Run `rounds` exchanges between a client and a server, the server on
/// its own thread.
pub fn exchange(method: &str, key_bits: u32, client: ClientConfig,
                server: ServerConfig, rounds: usize)
    -> (Side, Side) {
    let (client_transport, server_transport) = ChannelTransport::pair();

    let server_method = method.to_owned();
    let server_thread = thread::spawn(move || {
        let conn = server_connection(server, server_transport, &server_method, key_bits);
        run_side(conn, rounds)
    });

    let conn = client_connection(client, client_transport, method, key_bits);
    let client = run_side(conn, rounds);
    let server = server_thread.join().unwrap();

    (client, server)
}
