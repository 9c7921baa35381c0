//! Remote dataset source: fetches files from a running File Access Service.

use crate::domain::error::TradestatsError;
use crate::domain::settings::ClientSettings;
use crate::ports::dataset_source::DatasetSource;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

#[derive(Debug, serde::Deserialize)]
struct FileListing {
    files: Vec<String>,
}

pub struct HttpDatasetSource {
    client: Client,
    base_url: String,
}

impl HttpDatasetSource {
    pub fn new(settings: &ClientSettings) -> Result<Self, TradestatsError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_token))
            .map_err(|_| TradestatsError::ConfigInvalid {
                section: "client".into(),
                key: "api_token".into(),
                reason: "token is not a valid header value".into(),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TradestatsError::Fetch {
                file: settings.base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str, file: &str) -> Result<reqwest::blocking::Response, TradestatsError> {
        let fetch_err = |reason: String| TradestatsError::Fetch {
            file: file.to_string(),
            reason,
        };

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                fetch_err("request timed out".to_string())
            } else {
                fetch_err(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(TradestatsError::NotFound {
                path: file.to_string(),
            }),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(TradestatsError::Unauthorized),
            status => Err(fetch_err(format!("HTTP {}", status.as_u16()))),
        }
    }
}

/// Percent-encodes each `/`-separated segment of a relative file path.
fn encode_path(relative_path: &str) -> String {
    relative_path
        .trim_start_matches('/')
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

impl DatasetSource for HttpDatasetSource {
    fn list_files(&self) -> Result<Vec<String>, TradestatsError> {
        let url = format!("{}/files", self.base_url);
        let listing: FileListing = self
            .get(&url, "file listing")?
            .json()
            .map_err(|e| TradestatsError::Fetch {
                file: "file listing".into(),
                reason: e.to_string(),
            })?;
        Ok(listing.files)
    }

    fn fetch(&self, relative_path: &str) -> Result<Vec<u8>, TradestatsError> {
        let url = format!("{}/data/{}", self.base_url, encode_path(relative_path));
        tracing::debug!(%url, "fetching");
        let bytes = self
            .get(&url, relative_path)?
            .bytes()
            .map_err(|e| TradestatsError::Fetch {
                file: relative_path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }
}
