//! Typed message channel over a duplex byte stream
//!
//! Each value is serialized with the crypto codec and written as one frame.
//! Sealed values are serialized, encrypted under the session key and then
//! framed.

use crate::error::{ProtocolError, Result};
use crate::frame::{self, HEADER_SIZE};
use securemesh_crypto::{codec, decrypt_symmetric, encrypt_symmetric, Cipher, SymmetricKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Cipher used for every sealed frame
pub const SESSION_CIPHER: Cipher = Cipher::Aes;

/// Payload capacity reserved up front when reading a frame
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Any duplex stream a session can run over
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Type-erased transport, so sessions over TCP and in-memory pipes share
/// one type
pub type BoxedTransport = Box<dyn Transport>;

pub struct Wire<S> {
    stream: S,
}

impl<S> Wire<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Wire { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write one frame and flush it
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let header = frame::encode_header(payload.len())?;
        self.stream.write_all(&header).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one frame
    ///
    /// End of stream before a header is reported as
    /// [`ProtocolError::ConnectionClosed`].
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut header = [0u8; HEADER_SIZE];
        match self.stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ConnectionClosed)
            }
            Err(e) => return Err(e.into()),
        }

        // The buffer grows with the bytes actually received, not with the
        // announced length
        let len = frame::decode_header(header)?;
        let mut payload = Vec::with_capacity(len.min(INITIAL_CAPACITY));
        (&mut self.stream)
            .take(len as u64)
            .read_to_end(&mut payload)
            .await?;
        if payload.len() < len {
            return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into());
        }
        Ok(payload)
    }

    /// Send a plain value
    pub async fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let bytes = codec::serialize(value)?;
        self.write_frame(&bytes).await
    }

    /// Receive a plain value
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read_frame().await?;
        Ok(codec::deserialize(&bytes)?)
    }

    /// Send a value encrypted under `key`
    pub async fn send_sealed<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
        key: &SymmetricKey,
    ) -> Result<()> {
        let plain = codec::serialize(value)?;
        let sealed = encrypt_symmetric(SESSION_CIPHER, &plain, key)?;
        self.write_frame(&sealed).await
    }

    /// Receive a value encrypted under `key`
    pub async fn recv_sealed<T: DeserializeOwned>(&mut self, key: &SymmetricKey) -> Result<T> {
        let sealed = self.read_frame().await?;
        let plain = decrypt_symmetric(SESSION_CIPHER, &sealed, key)?;
        Ok(codec::deserialize(&plain)?)
    }

    /// Flush and close the write half
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl Wire<BoxedTransport> {
    /// Wrap any transport in a type-erased wire
    pub fn boxed<T: Transport + 'static>(stream: T) -> Self {
        Wire::new(Box::new(stream) as BoxedTransport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_FRAME_SIZE;
    use securemesh_crypto::{CryptoError, SymmetricKeySize};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_plain_values_in_order() {
        let (a, b) = duplex(4096);
        let mut client = Wire::new(a);
        let mut server = Wire::new(b);

        client.send("node-1").await.unwrap();
        client.send(&true).await.unwrap();
        client.send(&41234u16).await.unwrap();

        assert_eq!(server.recv::<String>().await.unwrap(), "node-1");
        assert!(server.recv::<bool>().await.unwrap());
        assert_eq!(server.recv::<u16>().await.unwrap(), 41234);
    }

    #[tokio::test]
    async fn test_sealed_values() {
        let (a, b) = duplex(4096);
        let mut client = Wire::new(a);
        let mut server = Wire::new(b);
        let key = SymmetricKey::generate(SymmetricKeySize::High);

        client.send_sealed("abc", &key).await.unwrap();
        assert_eq!(server.recv_sealed::<String>(&key).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_sealed_value_with_wrong_key() {
        let (a, b) = duplex(4096);
        let mut client = Wire::new(a);
        let mut server = Wire::new(b);

        let key = SymmetricKey::generate(SymmetricKeySize::High);
        let other = SymmetricKey::generate(SymmetricKeySize::High);

        client.send_sealed("abc", &key).await.unwrap();
        assert!(matches!(
            server.recv_sealed::<String>(&other).await,
            Err(ProtocolError::Crypto(CryptoError::Cipher))
        ));
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let (a, b) = duplex(64);
        drop(a);
        let mut server = Wire::new(b);
        assert!(matches!(
            server.read_frame().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_oversized_header_rejected() {
        let (mut a, b) = duplex(64);
        a.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();
        let mut server = Wire::new(b);
        assert!(matches!(
            server.read_frame().await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_large_frame() {
        let (mut a, b) = duplex(64);
        a.write_all(&frame::encode_header(MAX_FRAME_SIZE).unwrap())
            .await
            .unwrap();
        a.write_all(b"only a few bytes").await.unwrap();
        drop(a);

        let mut server = Wire::new(b);
        match server.read_frame().await {
            Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
    }

    #[tokio::test]
    async fn test_frame_larger_than_initial_capacity() {
        let (a, b) = duplex(8192);
        let mut client = Wire::new(a);
        let mut server = Wire::new(b);
        let payload = vec![7u8; INITIAL_CAPACITY * 3 + 5];

        let (sent, received) = tokio::join!(client.write_frame(&payload), server.read_frame());
        sent.unwrap();
        assert_eq!(received.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_error() {
        let (a, b) = duplex(64);
        let mut client = Wire::new(a);
        let mut server = Wire::new(b);

        client.send(&7u8).await.unwrap();
        assert!(matches!(
            server.recv::<String>().await,
            Err(ProtocolError::Crypto(CryptoError::Serialization(_)))
        ));
    }

    #[tokio::test]
    async fn test_boxed_wire() {
        let (a, b) = duplex(256);
        let mut client = Wire::boxed(a);
        let mut server = Wire::boxed(b);

        client.send("boxed").await.unwrap();
        assert_eq!(server.recv::<String>().await.unwrap(), "boxed");
    }
}
