use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep, timeout};

use crate::classifier::{ClassLabel, Predictor};
use crate::config::ServerConfig;
use crate::model_manager::{ModelError, ModelManager};

use super::protocol::{encode_response, ClassifyRequest, RequestError};

const READ_CHUNK: usize = 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    BindError {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Failed to load model: {0}")]
    ModelLoadError(#[from] ModelError),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// A bound classification daemon.
///
/// Binding and serving are separate steps so callers can learn the local
/// address (port 0 in tests) before the first accept.
pub struct Server {
    listener: TcpListener,
    predictor: Arc<dyn Predictor>,
    config: Arc<ServerConfig>,
}

// Compile-time check that the accept loop can move across runtime threads
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_all() {
        assert_send::<Server>();
    }
};

impl Server {
    /// Binds the configured address. The predictor must be fully loaded.
    pub async fn bind(config: ServerConfig, predictor: Arc<dyn Predictor>) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            error!("Failed to bind {}: {}", addr, source);
            ServerError::BindError { addr, source }
        })?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            predictor,
            config: Arc::new(config),
        })
    }

    /// Loads the newest export from `manager` and binds.
    ///
    /// The model is loaded before the socket is opened, so a bad export never
    /// leaves a listener that cannot answer.
    pub async fn with_latest_model(config: ServerConfig, manager: &ModelManager) -> Result<Self, ServerError> {
        let classifier = manager.load_latest().map_err(|e| {
            error!("Failed to load model from {:?}: {}", manager.models_dir(), e);
            e
        })?;
        let info = classifier.info();
        info!(
            "Loaded model from {:?} ({} classes, hidden units {:?})",
            info.source, info.num_classes, info.hidden_units
        );
        Self::bind(config, Arc::new(classifier)).await
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `shutdown` completes, then drains.
    ///
    /// In-flight connections get `drain_timeout` to finish after the listener
    /// closes; whatever is left after that is aborted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            predictor,
            config,
        } = self;
        let limiter = Arc::new(Semaphore::new(config.max_connections.max(1)));
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                permit = Arc::clone(&limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };
            debug!("Accepted connection from {}", peer);

            let predictor = Arc::clone(&predictor);
            let config = Arc::clone(&config);
            connections.spawn(async move {
                let _permit = permit;
                match handle_connection(stream, predictor.as_ref(), &config).await {
                    Ok(label) => info!("Classified request from {} as {} ({})", peer, label, label.name()),
                    Err(e) => warn!("Rejected connection from {}: {}", peer, e),
                }
            });

            while let Some(finished) = connections.try_join_next() {
                log_task_result(finished);
            }
        }

        drop(listener);
        info!("Shutting down, {} connection(s) in flight", connections.len());

        let drain = async {
            while let Some(finished) = connections.join_next().await {
                log_task_result(finished);
            }
        };
        if timeout(config.drain_timeout, drain).await.is_err() {
            warn!(
                "Drain timeout of {:?} elapsed, aborting {} connection(s)",
                config.drain_timeout,
                connections.len()
            );
            connections.shutdown().await;
        }
        info!("Server stopped");
        Ok(())
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Connection task panicked: {}", e);
        }
    }
}

/// Runs one exchange on an accepted stream: read one request, answer with one
/// label, close.
///
/// The stream is shut down whether or not the exchange succeeded; a rejected
/// request gets no bytes back.
pub async fn handle_connection<S>(
    mut stream: S,
    predictor: &dyn Predictor,
    config: &ServerConfig,
) -> Result<ClassLabel, RequestError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = exchange(&mut stream, predictor, config).await;
    let _ = stream.shutdown().await;
    outcome
}

async fn exchange<S>(stream: &mut S, predictor: &dyn Predictor, config: &ServerConfig) -> Result<ClassLabel, RequestError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = timeout(config.read_timeout, read_request(stream, config.max_request_bytes))
        .await
        .map_err(|_| RequestError::Timeout(config.read_timeout))??;
    debug!("Request: {:?}", request);

    let features = request.to_features()?;
    let label = predictor.predict(&features);

    stream.write_all(&encode_response(label)).await?;
    stream.flush().await?;
    Ok(label)
}

async fn read_request<S>(stream: &mut S, limit: usize) -> Result<ClassifyRequest, RequestError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK.min(limit));
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestError::Incomplete);
        }
        if buf.len() + n > limit {
            return Err(RequestError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(request) = ClassifyRequest::parse(&buf)? {
            return Ok(request);
        }
    }
}
