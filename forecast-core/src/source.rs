use reqwest::Url;
use std::{fmt::Debug, io::Read};
use tracing::debug;

use crate::error::ForecastError;

/// Opens the raw byte stream for a request URL.
pub trait ForecastSource: Send + Sync + Debug {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>, ForecastError>;
}

/// Streams the response body of a blocking HTTP GET.
///
/// There is no request timeout: a stalled server blocks the calling worker
/// until the connection drops.
#[derive(Debug, Clone, Default)]
pub struct HttpSource;

impl HttpSource {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastSource for HttpSource {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>, ForecastError> {
        debug!(
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
            "opening forecast stream"
        );

        let res = reqwest::blocking::get(url.clone())
            .and_then(|res| res.error_for_status())
            .map_err(ForecastError::transport)?;

        Ok(Box::new(res))
    }
}
