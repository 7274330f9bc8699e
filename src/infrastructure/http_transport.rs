use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::message::Message;
use crate::domain::ports::{check_reply, Endpoint, Transport, TransportError};

/// Longest slice of a non-protocol error body kept in a `RemoteError`
const MAX_ERROR_BODY: usize = 256;

/// Transport that POSTs JSON messages to an agent's HTTP endpoint
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(err: reqwest::Error, endpoint: &Endpoint, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_decode() || err.is_body() {
        TransportError::MalformedReply(err.to_string())
    } else {
        TransportError::Unreachable(format!("{}: {}", endpoint, err))
    }
}

fn truncate(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, message), fields(endpoint = %endpoint, correlation_id = message.correlation_id().unwrap_or("-")))]
    async fn send(
        &self,
        endpoint: &Endpoint,
        message: &Message,
        timeout: Duration,
    ) -> Result<Message, TransportError> {
        let url = reqwest::Url::parse(endpoint.as_str()).map_err(|e| {
            TransportError::Unreachable(format!("invalid endpoint {}: {}", endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::Unreachable(format!(
                "unsupported scheme in endpoint {}",
                endpoint
            )));
        }

        let exchange = async {
            let response = self
                .client
                .post(url)
                .json(message)
                .send()
                .await
                .map_err(|e| classify(e, endpoint, timeout))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| classify(e, endpoint, timeout))?;
            Ok::<_, TransportError>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        debug!(status = status.as_u16(), bytes = body.len(), "reply received");

        let parsed = serde_json::from_slice::<Message>(&body);
        if !status.is_success() {
            return match parsed {
                Ok(reply) if reply.is_error() => check_reply(message, reply),
                _ => Err(TransportError::RemoteError {
                    kind: format!("http_{}", status.as_u16()),
                    message: truncate(&body),
                }),
            };
        }

        let reply = parsed.map_err(|e| TransportError::MalformedReply(e.to_string()))?;
        check_reply(message, reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::Content;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> Message {
        Message::english("Weather alerts for Texas?")
            .unwrap()
            .with_metadata("correlation_id", "c-1")
    }

    fn endpoint(server: &MockServer) -> Endpoint {
        Endpoint::new(format!("{}/nlip/", server.uri()))
    }

    #[tokio::test]
    async fn delivers_and_returns_correlated_reply() {
        let server = MockServer::start().await;
        let reply = request().reply(Content::english("No alerts")).unwrap();
        Mock::given(method("POST"))
            .and(path("/nlip/"))
            .and(body_partial_json(json!({
                "format": "text",
                "subformat": "english",
                "metadata": { "correlation_id": "c-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
            .mount(&server)
            .await;

        let got = HttpTransport::new()
            .send(&endpoint(&server), &request(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(got, reply);
    }

    #[tokio::test]
    async fn slow_reply_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(&request())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .send(&endpoint(&server), &request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn non_protocol_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"format": "video"})))
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .send(&endpoint(&server), &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_reply");
    }

    #[tokio::test]
    async fn error_reply_is_surfaced_as_remote_error() {
        let server = MockServer::start().await;
        let failure = request().reply_failure("invalid_message_shape", "bad envelope", None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&failure))
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .send(&endpoint(&server), &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::RemoteError {
                kind: "invalid_message_shape".into(),
                message: "bad envelope".into()
            }
        );
    }

    #[tokio::test]
    async fn plain_http_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .send(&endpoint(&server), &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::RemoteError {
                kind: "http_502".into(),
                message: "bad gateway".into()
            }
        );
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = HttpTransport::new()
            .send(
                &Endpoint::new(format!("http://127.0.0.1:{}/nlip/", port)),
                &request(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unreachable");
    }

    #[tokio::test]
    async fn invalid_endpoint_is_unreachable() {
        let err = HttpTransport::new()
            .send(&Endpoint::new("not a url"), &request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unreachable");
    }
}
