extern crate byteorder;
extern crate crypto;
extern crate num_bigint;
extern crate rand;
extern crate rustc_serialize;
extern crate zeroize;
#[macro_use]
extern crate log;

pub mod packet;
pub mod message;
pub mod error;
pub mod algorithm;
pub mod gss;
pub mod key_exchange;
pub mod kexgss;
pub mod transport;
pub mod config;
pub mod session;
pub mod connection;

pub use self::config::{ClientConfig, ServerConfig};
pub use self::connection::{Connection, ConnectionType};
pub use self::error::{KexError, KexResult};
pub use self::kexgss::{run_client_exchange, run_server_exchange};
pub use self::session::KexSession;
pub use self::transport::{StreamTransport, Transport};
