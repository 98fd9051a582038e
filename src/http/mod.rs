pub mod retry;

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;

use crate::dispatch::Downloader;
use crate::errors::{FeederError, FeederResult};

pub use retry::{RetryPolicy, Transient};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3945.16 Safari/537.36";

/// A fetched response body with its declared content type
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Document {
    /// Body decoded with the charset declared in the content type, UTF-8
    /// when none is declared or the label is unknown.
    pub fn text(&self) -> String {
        let encoding = self
            .content_type
            .as_deref()
            .and_then(charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.bytes);
        text.into_owned()
    }
}

/// `charset` parameter of a content type header value
fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Shared blocking client for feed pages and file downloads.
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, retry: RetryPolicy) -> FeederResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url`, retrying transient failures. Anything but 200 is an error.
    pub fn get(&self, url: &str) -> FeederResult<Document> {
        self.retry.run(url, || {
            let response = self.client.get(url).send()?;
            let status = response.status();
            if status != StatusCode::OK {
                return Err(FeederError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_ascii_lowercase());
            let bytes = response.bytes()?.to_vec();

            debug!(url, bytes = bytes.len(), ?content_type, "fetched");
            Ok(Document {
                bytes,
                content_type,
            })
        })
    }

    /// Fetch a feed document whose content type must match one of `accepted`
    pub fn fetch_page(&self, url: &str, accepted: &[&str]) -> FeederResult<Document> {
        let document = self.get(url)?;
        check_content_type(url, document.content_type.as_deref(), accepted)?;
        Ok(document)
    }

    /// Download a binary file. Text responses are usually error pages and
    /// are rejected.
    pub fn download_file(&self, url: &str) -> FeederResult<Vec<u8>> {
        let document = self.get(url)?;
        check_download(url, &document)?;
        Ok(document.bytes)
    }
}

impl Downloader for HttpClient {
    fn download(&self, url: &str) -> FeederResult<Vec<u8>> {
        self.download_file(url)
    }
}

/// A missing content type is accepted; servers for static notice pages
/// often omit it.
fn check_content_type(url: &str, content_type: Option<&str>, accepted: &[&str]) -> FeederResult<()> {
    match content_type {
        Some(ct) if !accepted.iter().any(|a| ct.contains(a)) => Err(FeederError::UnexpectedContent {
            url: url.to_string(),
            content_type: ct.to_string(),
        }),
        _ => Ok(()),
    }
}

/// A downloaded file must not be a text page and must not be empty.
fn check_download(url: &str, document: &Document) -> FeederResult<()> {
    if let Some(content_type) = document.content_type.as_deref() {
        if content_type.starts_with("text/") {
            return Err(FeederError::UnexpectedContent {
                url: url.to_string(),
                content_type: content_type.to_string(),
            });
        }
    }
    if document.bytes.is_empty() {
        return Err(FeederError::Fetch {
            url: url.to_string(),
            reason: "empty body".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(bytes: &[u8], content_type: Option<&str>) -> Document {
        Document {
            bytes: bytes.to_vec(),
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn test_download_rejects_error_pages() {
        let page = document(b"<html>404</html>", Some("text/html; charset=utf-8"));
        let err = check_download("http://x/a.pdf", &page).unwrap_err();
        assert!(matches!(
            err,
            FeederError::UnexpectedContent { ref content_type, .. } if content_type.starts_with("text/html")
        ));
    }

    #[test]
    fn test_download_rejects_empty_body() {
        let empty = document(b"", Some("application/pdf"));
        assert!(matches!(
            check_download("http://x/a.pdf", &empty),
            Err(FeederError::Fetch { ref reason, .. }) if reason == "empty body"
        ));
    }

    #[test]
    fn test_download_accepts_binary() {
        assert!(check_download("http://x/a.pdf", &document(b"%PDF-1.4", Some("application/pdf"))).is_ok());
        assert!(check_download("http://x/a.pdf", &document(b"%PDF-1.4", None)).is_ok());
    }

    #[test]
    fn test_text_uses_declared_charset() {
        let page = document(b"\x93Fee notice\x94", Some("text/html; charset=windows-1252"));
        assert_eq!(page.text(), "\u{201c}Fee notice\u{201d}");

        let quoted = document(b"caf\xe9", Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(quoted.text(), "caf\u{e9}");
    }

    #[test]
    fn test_text_defaults_to_utf8() {
        assert_eq!(document("café".as_bytes(), Some("text/html")).text(), "café");
        assert_eq!(document("café".as_bytes(), None).text(), "café");
        assert_eq!(document(b"ok", Some("text/html; charset=bogus")).text(), "ok");
    }

    #[test]
    fn test_content_type_accepted() {
        let accepted = ["text/html", "application/xhtml"];
        assert!(check_content_type("u", Some("text/html; charset=utf-8"), &accepted).is_ok());
        assert!(check_content_type("u", Some("application/xhtml+xml"), &accepted).is_ok());
        assert!(check_content_type("u", None, &accepted).is_ok());
    }

    #[test]
    fn test_content_type_rejected() {
        let err = check_content_type("http://x/notices", Some("application/pdf"), &["text/html"])
            .unwrap_err();
        assert!(matches!(
            err,
            FeederError::UnexpectedContent { ref content_type, .. } if content_type == "application/pdf"
        ));
    }

    #[test]
    fn test_client_builds() {
        let client = HttpClient::new(DEFAULT_USER_AGENT, Duration::from_secs(5), RetryPolicy::new(3));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().retry_policy().max_attempts, 3);
    }
}
