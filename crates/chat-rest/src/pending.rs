//! Pending login/registration socket.

use crate::{RestError, RestResult};
use chat_protocol::PendingAuthResult;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

/// Open `{ws_base}/{uuid}` and wait for the single outcome frame.
///
/// The socket is closed after the first text frame whatever it says.
pub async fn await_pending_result(
    ws_base: &Url,
    uuid: &str,
    timeout: Duration,
) -> RestResult<PendingAuthResult> {
    let url = pending_url(ws_base, uuid)?;
    debug!(url = %url, "waiting for pending auth result");

    let (mut ws, _) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| RestError::Timeout("pending socket"))??;

    let read = async {
        while let Some(msg) = ws.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(text.to_string())),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok::<_, RestError>(None)
    };

    let text = tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| RestError::Timeout("auth result"))??;

    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "pending socket close failed");
    }

    let text = text.ok_or_else(|| {
        RestError::AuthFailed("Connection closed before a result arrived".to_string())
    })?;

    PendingAuthResult::parse(&text).map_err(|e| {
        warn!(error = %e, "malformed pending auth result");
        RestError::AuthFailed(format!("Malformed auth result: {}", e))
    })
}

fn pending_url(ws_base: &Url, uuid: &str) -> RestResult<Url> {
    let mut url = ws_base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(uuid);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_pending_url() {
        let base = Url::parse("ws://localhost:8080/ws").unwrap();
        assert_eq!(
            pending_url(&base, "abc-123").unwrap().as_str(),
            "ws://localhost:8080/ws/abc-123"
        );

        let base = Url::parse("ws://localhost:8080/ws/").unwrap();
        assert_eq!(
            pending_url(&base, "abc").unwrap().as_str(),
            "ws://localhost:8080/ws/abc"
        );
    }

    async fn serve_one(frame: Option<&'static str>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            match frame {
                Some(text) => {
                    ws.send(Message::Text(text.to_string().into())).await.unwrap();
                    let _ = ws.next().await;
                }
                None => {
                    let _ = ws.close(None).await;
                }
            }
        });
        Url::parse(&format!("ws://{}/ws", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_reads_single_result() {
        let base = serve_one(Some(r#"{"uuid":"u1","success":true,"message":"ok","token":"jwt"}"#)).await;
        let result = await_pending_result(&base, "u1", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.token.as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_close_without_result_fails() {
        let base = serve_one(None).await;
        let err = await_pending_result(&base, "u1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::AuthFailed(_)));
    }
}
