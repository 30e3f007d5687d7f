//! Client side of the classification protocol, as used by sensor devices.

use std::fmt::Display;
use std::io;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

use crate::classifier::{ClassLabel, FeatureVector};
use crate::server::{decode_response, ClassifyRequest};

/// Connect timeout used by device clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot connect to {addr}, check if the server is running: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Classification server timeout after {0:?}")]
    Timeout(Duration),
    #[error("Server closed the connection without a label")]
    NoResponse,
    #[error("Unexpected response from server: {0:?}")]
    BadResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sends one feature vector to a classification daemon and returns its label.
///
/// `limit` bounds the connect and the wait for the reply separately.
pub async fn classify_remote<A>(addr: A, features: &FeatureVector, limit: Duration) -> Result<ClassLabel, ClientError>
where
    A: ToSocketAddrs + Display,
{
    let target = addr.to_string();
    let mut stream = match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(ClientError::Connect { addr: target, source }),
        Err(_) => return Err(ClientError::Timeout(limit)),
    };

    let body = serde_json::to_vec(&ClassifyRequest::from(features))?;
    debug!("Sending {} bytes to {}", body.len(), target);
    stream.write_all(&body).await?;
    stream.flush().await?;

    let mut line = String::new();
    let mut reader = BufReader::new(stream);
    let read = timeout(limit, reader.read_line(&mut line))
        .await
        .map_err(|_| ClientError::Timeout(limit))??;
    if read == 0 {
        return Err(ClientError::NoResponse);
    }

    decode_response(&line).ok_or(ClientError::BadResponse(line))
}
