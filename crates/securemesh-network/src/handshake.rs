//! Session establishment
//!
//! Both halves of the connection handshake. The initiating side sends its
//! id and whether it holds a cached key; the accepting side either confirms
//! the cached key or runs an ephemeral ECDH exchange. The initiator then
//! proves the shared secret and names a handler, all sealed under the
//! session key.
//!
//! ```text
//! client                               server
//!   id, known               ------>
//!                           <------    reuse?
//!   [port                   ------>
//!                           <------    ec bits, public key
//!   public key              ------>
//!                           <------    hash name, key bits]
//!   {secret}, {handler}     ------>
//!   ... handler conversation ...
//! ```

use crate::error::{NetworkError, Result};
use crate::handler::{Handler, HandlerRegistry};
use crate::identity::NodeIdentity;
use crate::peer::{Peer, PeerTable};
use securemesh_crypto::{
    derive_shared_key, EcKeySize, HashAlgorithm, KeyPair, PublicKey, SymmetricKey,
    SymmetricKeySize,
};
use securemesh_protocol::{BoxedTransport, HandshakeState, HandshakeTracker, Session, Wire};
use tracing::{debug, warn};

/// Run the initiating side against an open connection
///
/// Offers `cached` when present and runs `handler` once authenticated.
/// Returns the key the session ran under, which differs from `cached` when
/// the remote forced a fresh exchange.
pub async fn initiate(
    wire: Wire<BoxedTransport>,
    local: &NodeIdentity,
    remote_id: &str,
    cached: Option<&SymmetricKey>,
    handler_name: &str,
    handler: &dyn Handler,
) -> Result<SymmetricKey> {
    let mut tracker = HandshakeTracker::new("client");
    tracker.set_peer(remote_id);

    let result = run_initiator(
        &mut tracker,
        wire,
        local,
        remote_id,
        cached,
        handler_name,
        handler,
    )
    .await;

    tracker.close(result.is_ok());
    result
}

async fn run_initiator(
    tracker: &mut HandshakeTracker,
    mut wire: Wire<BoxedTransport>,
    local: &NodeIdentity,
    remote_id: &str,
    cached: Option<&SymmetricKey>,
    handler_name: &str,
    handler: &dyn Handler,
) -> Result<SymmetricKey> {
    wire.send(local.id()).await?;
    wire.send(&cached.is_some()).await?;
    let reuse: bool = wire.recv().await?;

    let key = match cached {
        Some(key) if reuse => {
            tracker.advance(HandshakeState::Authenticating)?;
            key.clone()
        }
        _ => {
            tracker.advance(HandshakeState::KeyNegotiation)?;
            let key = negotiate_as_client(&mut wire, local.port()).await?;
            tracker.advance(HandshakeState::Authenticating)?;
            key
        }
    };

    wire.send_sealed(local.secret(), &key).await?;
    wire.send_sealed(handler_name, &key).await?;
    tracker.advance(HandshakeState::Dispatching)?;

    let mut session = Session::new(wire, key.clone(), remote_id);
    handler.handle(&mut session).await?;
    Ok(key)
}

/// Client half of the ephemeral exchange; the server picks every parameter
async fn negotiate_as_client(
    wire: &mut Wire<BoxedTransport>,
    port: u16,
) -> Result<SymmetricKey> {
    wire.send(&port).await?;

    let ec_size = EcKeySize::from_bits(wire.recv().await?)?;
    let key_pair = KeyPair::generate_ec(ec_size);
    let remote: PublicKey = wire.recv().await?;
    wire.send(key_pair.public_key()).await?;

    let hash: HashAlgorithm = wire.recv::<String>().await?.parse()?;
    let key_size = SymmetricKeySize::from_bits(wire.recv().await?)?;

    Ok(derive_shared_key(hash, key_size, &key_pair, &remote)?)
}

/// Run the accepting side against an inbound connection
///
/// `remote_host` is recorded as the peer's host when a fresh key is
/// established. The peer entry is written only after the initiator proved
/// the shared secret.
pub async fn accept(
    wire: Wire<BoxedTransport>,
    remote_host: &str,
    local: &NodeIdentity,
    peers: &PeerTable,
    handlers: &HandlerRegistry,
) -> Result<()> {
    let mut tracker = HandshakeTracker::new("server");
    let result = run_acceptor(&mut tracker, wire, remote_host, local, peers, handlers).await;

    tracker.close(result.is_ok());
    result
}

async fn run_acceptor(
    tracker: &mut HandshakeTracker,
    mut wire: Wire<BoxedTransport>,
    remote_host: &str,
    local: &NodeIdentity,
    peers: &PeerTable,
    handlers: &HandlerRegistry,
) -> Result<()> {
    let id: String = wire.recv().await?;
    tracker.set_peer(&id);
    let known: bool = wire.recv().await?;

    // A claim of `known` counts only if we hold a key for that id
    let cached = if known { peers.key_of(&id).await } else { None };

    let (key, fresh_port) = match cached {
        Some(key) => {
            wire.send(&true).await?;
            tracker.advance(HandshakeState::Authenticating)?;
            (key, None)
        }
        None => {
            wire.send(&false).await?;
            tracker.advance(HandshakeState::KeyNegotiation)?;
            let (key, port) = negotiate_as_server(&mut wire, local).await?;
            tracker.advance(HandshakeState::Authenticating)?;
            (key, Some(port))
        }
    };

    let secret: String = wire.recv_sealed(&key).await?;
    if secret != local.secret() {
        warn!("Authentication failed for {} ({})", id, remote_host);
        return Err(NetworkError::AuthenticationFailure);
    }
    let handler_name: String = wire.recv_sealed(&key).await?;

    if let Some(port) = fresh_port {
        peers
            .upsert(Peer::new(id.clone(), remote_host, port).with_key(key.clone()))
            .await;
        debug!("Stored session key for {} at {}:{}", id, remote_host, port);
    }

    let handler = handlers.resolve(&handler_name).await?;
    tracker.advance(HandshakeState::Dispatching)?;

    let mut session = Session::new(wire, key, id);
    handler.handle(&mut session).await
}

/// Server half of the ephemeral exchange; returns the key and the
/// initiator's advertised port
async fn negotiate_as_server(
    wire: &mut Wire<BoxedTransport>,
    local: &NodeIdentity,
) -> Result<(SymmetricKey, u16)> {
    let settings = local.settings();
    let port: u16 = wire.recv().await?;

    wire.send(&settings.ec_key_size.bits()).await?;
    let key_pair = KeyPair::generate_ec(settings.ec_key_size);
    wire.send(key_pair.public_key()).await?;
    let remote: PublicKey = wire.recv().await?;

    wire.send(settings.hash_algorithm.name()).await?;
    wire.send(&settings.symmetric_key_size.bits()).await?;

    let key = derive_shared_key(
        settings.hash_algorithm,
        settings.symmetric_key_size,
        &key_pair,
        &remote,
    )?;
    Ok((key, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MeshSettings;
    use async_trait::async_trait;
    use securemesh_protocol::ProtocolError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::duplex;
    use tokio::sync::Mutex;

    struct Reply(&'static str);

    #[async_trait]
    impl Handler for Reply {
        async fn handle(&self, session: &mut Session) -> Result<()> {
            session.write(self.0).await?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct ReadOne(Mutex<Option<String>>);

    #[async_trait]
    impl Handler for ReadOne {
        async fn handle(&self, session: &mut Session) -> Result<()> {
            let value: String = session.read().await?;
            *self.0.lock().await = Some(value);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Flag(AtomicBool);

    #[async_trait]
    impl Handler for Flag {
        async fn handle(&self, _session: &mut Session) -> Result<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        server: NodeIdentity,
        client: NodeIdentity,
        peers: PeerTable,
        handlers: HandlerRegistry,
    }

    async fn fixture(server_secret: &str, client_secret: &str) -> Fixture {
        let handlers = HandlerRegistry::new();
        handlers.register("echo", Arc::new(Reply("echo"))).await;
        Fixture {
            server: NodeIdentity::master(9000, MeshSettings::new(server_secret)),
            client: NodeIdentity::new("c1", 41000, MeshSettings::new(client_secret)),
            peers: PeerTable::new(),
            handlers,
        }
    }

    async fn exchange(
        f: &Fixture,
        cached: Option<&SymmetricKey>,
        handler_name: &str,
        handler: &dyn Handler,
    ) -> (Result<SymmetricKey>, Result<()>) {
        let (a, b) = duplex(64 * 1024);
        tokio::join!(
            initiate(
                Wire::boxed(a),
                &f.client,
                "master",
                cached,
                handler_name,
                handler
            ),
            accept(Wire::boxed(b), "127.0.0.1", &f.server, &f.peers, &f.handlers),
        )
    }

    #[tokio::test]
    async fn test_full_exchange_stores_peer() {
        let f = fixture("abc", "abc").await;
        let reader = ReadOne::default();

        let (client, server) = exchange(&f, None, "echo", &reader).await;
        server.unwrap();
        let key = client.unwrap();

        assert_eq!(reader.0.lock().await.as_deref(), Some("echo"));
        let peer = f.peers.get("c1").await.unwrap();
        assert_eq!(peer.host(), "127.0.0.1");
        assert_eq!(peer.port(), 41000);
        assert_eq!(peer.key(), Some(&key));
        assert_eq!(key.size(), SymmetricKeySize::High);
    }

    #[tokio::test]
    async fn test_cached_key_is_reused() {
        let f = fixture("abc", "abc").await;

        let (client, _) = exchange(&f, None, "echo", &ReadOne::default()).await;
        let key = client.unwrap();
        let stamped = f.peers.get("c1").await.unwrap().last_handshake();

        let (client, server) = exchange(&f, Some(&key), "echo", &ReadOne::default()).await;
        server.unwrap();
        assert_eq!(client.unwrap(), key);

        let peer = f.peers.get("c1").await.unwrap();
        assert_eq!(peer.key(), Some(&key));
        assert_eq!(peer.last_handshake(), stamped);
    }

    #[tokio::test]
    async fn test_unbacked_known_claim_renegotiates() {
        let f = fixture("abc", "abc").await;
        let stale = SymmetricKey::generate(SymmetricKeySize::High);

        let (client, server) = exchange(&f, Some(&stale), "echo", &ReadOne::default()).await;
        server.unwrap();
        let key = client.unwrap();

        assert_ne!(key, stale);
        assert_eq!(f.peers.key_of("c1").await, Some(key));
    }

    #[tokio::test]
    async fn test_keyless_entry_is_not_reused() {
        let f = fixture("abc", "abc").await;
        f.peers.upsert(Peer::new("c1", "10.0.0.9", 1)).await;
        let stale = SymmetricKey::generate(SymmetricKeySize::High);

        let (client, server) = exchange(&f, Some(&stale), "echo", &ReadOne::default()).await;
        server.unwrap();
        assert_ne!(client.unwrap(), stale);
        assert_eq!(f.peers.get("c1").await.unwrap().port(), 41000);
    }

    #[tokio::test]
    async fn test_wrong_secret_never_dispatches() {
        let f = fixture("abc", "wrong").await;
        let flag = Arc::new(Flag::default());
        f.handlers.register("flag", flag.clone()).await;

        let (client, server) = exchange(&f, None, "flag", &ReadOne::default()).await;

        assert!(matches!(server, Err(NetworkError::AuthenticationFailure)));
        assert!(matches!(
            client,
            Err(NetworkError::Protocol(ProtocolError::ConnectionClosed))
        ));
        assert!(!flag.0.load(Ordering::SeqCst));
        assert!(f.peers.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_handler_uses_fallback() {
        let f = fixture("abc", "abc").await;
        f.handlers.register("", Arc::new(Reply("fallback"))).await;
        let reader = ReadOne::default();

        let (client, server) = exchange(&f, None, "nope", &reader).await;
        server.unwrap();
        client.unwrap();
        assert_eq!(reader.0.lock().await.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_unknown_handler_without_fallback_drops() {
        let f = fixture("abc", "abc").await;

        let (client, server) = exchange(&f, None, "nope", &ReadOne::default()).await;
        assert!(matches!(server, Err(NetworkError::HandlerNotFound(name)) if name == "nope"));
        assert!(client.is_err());
    }

    #[tokio::test]
    async fn test_server_parameters_are_used() {
        let mut f = fixture("abc", "abc").await;
        let mut settings = MeshSettings::new("abc");
        settings.hash_algorithm = HashAlgorithm::Sha512;
        settings.symmetric_key_size = SymmetricKeySize::Low;
        settings.ec_key_size = EcKeySize::High;
        f.server = NodeIdentity::master(9000, settings);

        let (client, server) = exchange(&f, None, "echo", &ReadOne::default()).await;
        server.unwrap();
        assert_eq!(client.unwrap().size(), SymmetricKeySize::Low);
    }
}
