//! HTTP client for the Pi-hole management API (`api.php`).

use reqwest::blocking::{Client, Request};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::error::ApiError;

const API_ENDPOINT: &str = "api.php";

/// Reply body of the enable, disable and status calls
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

/// Filtering state reported by the appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplianceStatus {
    Enabled,
    Disabled,
    Other(String),
}

impl StatusResponse {
    #[must_use]
    pub fn state(&self) -> ApplianceStatus {
        match self.status.as_str() {
            "enabled" => ApplianceStatus::Enabled,
            "disabled" => ApplianceStatus::Disabled,
            other => ApplianceStatus::Other(other.to_string()),
        }
    }
}

/// Operations the CLI needs from the appliance.
#[cfg_attr(test, automock)]
pub trait ApplianceApi {
    /// Turn filtering on.
    fn enable(&self) -> Result<StatusResponse, ApiError>;

    /// Turn filtering off for `seconds`, or until re-enabled when zero.
    fn disable(&self, seconds: u64) -> Result<StatusResponse, ApiError>;

    /// Query the current filtering state.
    fn status(&self) -> Result<StatusResponse, ApiError>;
}

/// Blocking client bound to one appliance URL and secret
pub struct PiHoleClient {
    client: Client,
    endpoint: String,
    secret: String,
}

impl PiHoleClient {
    /// Create a client for the appliance at `api_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_url: &str, api_secret: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(format!("phc/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            endpoint: format!("{}/{API_ENDPOINT}", api_url.trim_end_matches('/')),
            secret: api_secret.to_string(),
        })
    }

    // Build a GET request carrying one action parameter plus the auth token
    fn request(&self, action: &str, value: &str) -> Result<Request, ApiError> {
        self.client
            .get(&self.endpoint)
            .query(&[(action, value), ("auth", self.secret.as_str())])
            .build()
            .map_err(strip_url)
    }

    fn send(&self, action: &str, value: &str) -> Result<StatusResponse, ApiError> {
        let request = self.request(action, value)?;
        debug!("{} {}?{}", request.method(), self.endpoint, action);

        let response = self
            .client
            .execute(request)
            .and_then(|response| response.error_for_status())
            .map_err(strip_url)?;
        debug!("appliance answered with HTTP {}", response.status());

        response.json::<StatusResponse>().map_err(strip_url)
    }
}

// reqwest errors embed the full URL, which includes the secret
fn strip_url(err: reqwest::Error) -> ApiError {
    ApiError::Request(err.without_url())
}

impl ApplianceApi for PiHoleClient {
    fn enable(&self) -> Result<StatusResponse, ApiError> {
        self.send("enable", "")
    }

    fn disable(&self, seconds: u64) -> Result<StatusResponse, ApiError> {
        self.send("disable", &seconds.to_string())
    }

    fn status(&self) -> Result<StatusResponse, ApiError> {
        self.send("status", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    // Answer exactly one HTTP request, handing back its request line
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/admin", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }

            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();

            request_line.trim_end().to_string()
        });

        (base_url, handle)
    }

    fn client() -> PiHoleClient {
        PiHoleClient::new("http://pi.local/admin", "s3cret").unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let with_slash = PiHoleClient::new("http://pi.local/admin/", "s3cret").unwrap();
        assert_eq!(with_slash.endpoint, "http://pi.local/admin/api.php");
        assert_eq!(client().endpoint, "http://pi.local/admin/api.php");
    }

    #[test]
    fn test_enable_request_url() {
        let request = client().request("enable", "").unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://pi.local/admin/api.php?enable=&auth=s3cret"
        );
    }

    #[test]
    fn test_disable_request_carries_duration() {
        let request = client().request("disable", "30").unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://pi.local/admin/api.php?disable=30&auth=s3cret"
        );
    }

    #[test]
    fn test_secret_is_query_encoded() {
        let client = PiHoleClient::new("http://pi.local/admin", "a b&c").unwrap();
        let request = client.request("status", "").unwrap();
        assert_eq!(request.url().query(), Some("status=&auth=a+b%26c"));
    }

    #[test]
    fn test_status_interpretation() {
        let parse = |body: &str| serde_json::from_str::<StatusResponse>(body).unwrap().state();

        assert_eq!(parse(r#"{"status":"enabled"}"#), ApplianceStatus::Enabled);
        assert_eq!(parse(r#"{"status":"disabled"}"#), ApplianceStatus::Disabled);
        assert_eq!(
            parse(r#"{"status":"unknown"}"#),
            ApplianceStatus::Other("unknown".to_string())
        );
    }

    #[test]
    fn test_unauthenticated_reply_does_not_decode() {
        // Pi-hole answers a bad token with an empty array
        assert!(serde_json::from_str::<StatusResponse>("[]").is_err());
    }

    #[test]
    fn test_connection_error_hides_secret() {
        let client = PiHoleClient::new("http://127.0.0.1:1", "s3cret").unwrap();
        let err = client.enable().unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn test_enable_against_server() {
        let (base_url, server) = serve_once("200 OK", r#"{"status":"enabled"}"#);
        let client = PiHoleClient::new(&base_url, "s3cret").unwrap();

        let response = client.enable().unwrap();

        assert_eq!(response.state(), ApplianceStatus::Enabled);
        assert_eq!(
            server.join().unwrap(),
            "GET /admin/api.php?enable=&auth=s3cret HTTP/1.1"
        );
    }

    #[test]
    fn test_disable_against_server() {
        let (base_url, server) = serve_once("200 OK", r#"{"status":"disabled"}"#);
        let client = PiHoleClient::new(&base_url, "s3cret").unwrap();

        let response = client.disable(30).unwrap();

        assert_eq!(response.state(), ApplianceStatus::Disabled);
        assert_eq!(
            server.join().unwrap(),
            "GET /admin/api.php?disable=30&auth=s3cret HTTP/1.1"
        );
    }

    #[test]
    fn test_server_error_status_is_an_error() {
        let (base_url, server) = serve_once("500 Internal Server Error", "{}");
        let client = PiHoleClient::new(&base_url, "s3cret").unwrap();

        let err = client.status().unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ApiError::Request(_)));
        assert!(err.to_string().contains("500"));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn test_unauthenticated_reply_is_an_error() {
        let (base_url, server) = serve_once("200 OK", "[]");
        let client = PiHoleClient::new(&base_url, "s3cret").unwrap();

        let err = client.enable().unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ApiError::Request(_)));
        assert!(!err.to_string().contains("s3cret"));
    }
}
