use anyhow::{Context, Result, anyhow};
use std::{fmt::Debug, io::Read};
use tracing::warn;

use crate::model::{Icon, IconFormat};

/// Retrieves and decodes a sky-condition image.
///
/// Called synchronously from the fetch worker. Any failure degrades to
/// `None`; it never aborts the surrounding forecast decode.
pub trait IconLoader: Send + Sync + Debug {
    fn load(&self, url: &str, sample_size: Option<u32>) -> Option<Icon>;
}

/// Downloads icons over HTTP with a blocking GET.
#[derive(Debug, Clone, Default)]
pub struct HttpIconLoader;

impl HttpIconLoader {
    pub fn new() -> Self {
        Self
    }

    fn download(url: &str) -> Result<Vec<u8>> {
        let res = reqwest::blocking::get(url).context("Failed to send forecast icon request")?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("Forecast icon request failed with status {status}"));
        }

        let mut bytes = Vec::new();
        res.take(MAX_ICON_BYTES)
            .read_to_end(&mut bytes)
            .context("Failed to read forecast icon body")?;
        Ok(bytes)
    }
}

const MAX_ICON_BYTES: u64 = 1 << 20;

impl IconLoader for HttpIconLoader {
    fn load(&self, url: &str, sample_size: Option<u32>) -> Option<Icon> {
        let bytes = match Self::download(url) {
            Ok(bytes) => bytes,
            Err(err) => {
                let error = format!("{err:#}");
                warn!(url, %error, "failed to download forecast icon");
                return None;
            }
        };

        let Some(format) = IconFormat::sniff(&bytes) else {
            warn!(url, len = bytes.len(), "forecast icon is not a recognized image");
            return None;
        };

        Some(Icon::new(url.to_string(), format, sample_size, bytes))
    }
}
