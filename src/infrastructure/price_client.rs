//! Client for the remote price service
//!
//! The service answers `GET {base_url}?symbol={ticker}` with a JSON object
//! carrying a `price` field, either as a decimal string or a number.

use crate::config::PriceServiceSettings;
use crate::domain::Ticker;
use crate::enrichment::WorkflowError;
use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Source of current market prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, ticker: &Ticker) -> Result<Decimal, WorkflowError>;
}

/// HTTP implementation of [`PriceSource`]
#[derive(Clone)]
pub struct HttpPriceClient {
    base_url: String,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HttpPriceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            base_url: base_url.into(),
            timeout,
            client,
        }
    }

    pub fn from_settings(settings: &PriceServiceSettings) -> Self {
        Self::new(
            settings.base_url.clone(),
            settings.timeout(),
            settings.connect_timeout(),
        )
    }

    fn request_uri(&self, ticker: &Ticker) -> Result<Uri, WorkflowError> {
        let url = format!(
            "{}?symbol={}",
            self.base_url,
            urlencoding::encode(ticker.as_ref())
        );
        url.parse::<Uri>()
            .map_err(|e| WorkflowError::upstream(format!("Invalid price service URL {url}: {e}")))
    }

    async fn exchange(&self, uri: Uri) -> Result<Decimal, WorkflowError> {
        let request = Request::get(uri)
            .header(hyper::header::ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|e| WorkflowError::upstream(format!("HTTP error: {e}")))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| WorkflowError::upstream(format!("Connection error: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WorkflowError::upstream(format!(
                "Price service responded with {status}"
            )));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| WorkflowError::upstream(format!("Body collection error: {e}")))?
            .to_bytes();

        parse_price(&body)
    }
}

#[async_trait]
impl PriceSource for HttpPriceClient {
    async fn fetch_price(&self, ticker: &Ticker) -> Result<Decimal, WorkflowError> {
        let uri = self.request_uri(ticker)?;
        debug!(%uri, "Fetching price");

        tokio::time::timeout(self.timeout, self.exchange(uri))
            .await
            .map_err(|_| {
                WorkflowError::upstream(format!("Price request timed out after {:?}", self.timeout))
            })?
    }
}

/// Extract the `price` field of a price service answer
pub fn parse_price(body: &[u8]) -> Result<Decimal, WorkflowError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| WorkflowError::upstream(format!("Malformed price response: {e}")))?;

    let raw = match value.get("price") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(WorkflowError::upstream(format!(
                "Price field has unexpected type: {other}"
            )))
        }
        None => return Err(WorkflowError::upstream("Price response lacks a price field")),
    };

    Decimal::from_str(raw.trim())
        .map_err(|e| WorkflowError::upstream(format!("Price {raw:?} is not a decimal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    const PRICE_PATH: &str = "/api/v3/ticker/price";

    fn client_for(server: &Server, timeout: Duration) -> HttpPriceClient {
        HttpPriceClient::new(
            format!("{}{PRICE_PATH}", server.url()),
            timeout,
            Duration::from_secs(2),
        )
    }

    fn btc() -> Ticker {
        Ticker::try_new("BTCUSDT").unwrap()
    }

    #[rstest]
    #[case(br#"{"symbol":"BTCUSDT","price":"60000.00"}"#, "60000.00")]
    #[case(br#"{"price":"  42.5 "}"#, "42.5")]
    #[case(br#"{"price":17}"#, "17")]
    fn parse_price_accepts_strings_and_numbers(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(parse_price(body).unwrap(), Decimal::from_str(expected).unwrap());
    }

    #[rstest]
    #[case(b"not json")]
    #[case(br#"{"symbol":"BTCUSDT"}"#)]
    #[case(br#"{"price":"abc"}"#)]
    #[case(br#"{"price":null}"#)]
    fn parse_price_rejects_unusable_bodies(#[case] body: &[u8]) {
        assert!(matches!(parse_price(body), Err(WorkflowError::Upstream(_))));
    }

    #[tokio::test]
    async fn fetch_price_queries_symbol_and_parses_answer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PRICE_PATH)
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"BTCUSDT","price":"60000.00"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(3));
        let price = client.fetch_price(&btc()).await.unwrap();

        assert_eq!(price, Decimal::from_str("60000.00").unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ticker_is_url_encoded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PRICE_PATH)
            .match_query(Matcher::UrlEncoded("symbol".into(), "BRK B&C".into()))
            .with_status(200)
            .with_body(r#"{"price":"1.00"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(3));
        let ticker = Ticker::try_new("BRK B&C").unwrap();
        assert!(client.fetch_price(&ticker).await.is_ok());
        mock.assert_async().await;
    }

    #[rstest]
    #[case(500)]
    #[case(404)]
    #[case(204)]
    #[tokio::test]
    async fn non_ok_status_is_upstream_error(#[case] status: usize) {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PRICE_PATH)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body(r#"{"price":"1.00"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(3));
        let err = client.fetch_price(&btc()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Upstream(_)), "{err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PRICE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client_for(&server, Duration::from_secs(3));
        assert!(matches!(
            client.fetch_price(&btc()).await,
            Err(WorkflowError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn silent_service_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = tokio::spawn(async move {
            // Accept and hold the connection without answering
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = HttpPriceClient::new(
            format!("http://{addr}{PRICE_PATH}"),
            Duration::from_millis(100),
            Duration::from_secs(2),
        );

        let started = std::time::Instant::now();
        let err = client.fetch_price(&btc()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Upstream(ref m) if m.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(5));
        holder.abort();
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpPriceClient::new(
            format!("http://{addr}{PRICE_PATH}"),
            Duration::from_secs(3),
            Duration::from_secs(2),
        );

        assert!(matches!(
            client.fetch_price(&btc()).await,
            Err(WorkflowError::Upstream(_))
        ));
    }
}
