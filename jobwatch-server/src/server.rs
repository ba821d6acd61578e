use crate::router;
use crate::state::AppState;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use jobwatch_core::ipc::{JobwatchRequest, JobwatchResponse};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

fn le_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

pub async fn run_unix_server(
    socket_path: &str,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    remove_stale_socket(socket_path)?;
    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(path = socket_path, "Jobwatch IPC socket listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move { serve_connection(stream, &state).await });
                }
                Err(e) => tracing::warn!(error = %e, "Failed to accept IPC connection"),
            },
            _ = shutdown.recv() => {
                tracing::info!("IPC socket closing");
                break;
            }
        }
    }

    remove_stale_socket(socket_path)?;
    Ok(())
}

fn remove_stale_socket(socket_path: &str) -> std::io::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }
    Ok(())
}

/// 4-byte little-endian length prefix + MessagePack payload, one response per request.
async fn serve_connection(stream: UnixStream, state: &AppState) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, le_codec());
    let mut framed_write = FramedWrite::new(write, le_codec());

    while let Some(frame) = framed_read.next().await {
        let payload = match frame {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Malformed IPC frame");
                break;
            }
        };

        let response = match rmp_serde::from_slice::<JobwatchRequest>(&payload) {
            Ok(request) => router::handle_request(request, state).await,
            Err(e) => JobwatchResponse::err(format!("Deserialization error: {}", e)),
        };

        let encoded = match rmp_serde::to_vec_named(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode IPC response");
                break;
            }
        };
        if let Err(e) = framed_write.send(Bytes::from(encoded)).await {
            tracing::debug!(error = %e, "IPC client went away");
            break;
        }
    }
}
