//! SecureMesh wire protocol
//!
//! Length-delimited frames carrying typed values, optionally sealed under
//! a session key, plus the handshake state machine that drives them.

pub mod error;
pub mod frame;
pub mod session;
pub mod state;
pub mod wire;

pub use error::{ProtocolError, Result};
pub use frame::{HEADER_SIZE, MAX_FRAME_SIZE};
pub use session::Session;
pub use state::{HandshakeState, HandshakeTracker};
pub use wire::{BoxedTransport, Transport, Wire, SESSION_CIPHER};
