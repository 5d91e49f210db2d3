// src/fetch/mod.rs
//! Thin downloader for the open-data portal: look up a CKAN package, pick
//! the resources worth having, and pull their bytes. Everything it returns
//! is handed to staging as-is; no retries, no auth.

use anyhow::{bail, Context, Result};
use futures::{stream, StreamExt, TryStreamExt};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::stage::Resource;

mod stations;
pub use self::stations::{
    fetch_station_info, parse_station_info, write_station_info, Station, STATION_INFO_FILE,
};

const MAX_CONCURRENCY: usize = 3;

#[derive(Debug, Deserialize)]
struct PackageResponse {
    success: bool,
    result: Option<Package>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceMeta>,
}

/// One downloadable file listed by a package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceMeta {
    pub name: String,
    #[serde(default)]
    pub format: String,
    pub url: String,
}

/// `<package_url>?id=<package_id>`
pub fn package_show_url(package_url: &str, package_id: &str) -> Result<Url> {
    Url::parse_with_params(package_url, &[("id", package_id)])
        .with_context(|| format!("bad package url {}", package_url))
}

/// Decode a `package_show` response body.
pub fn parse_package(body: &str) -> Result<Package> {
    let resp: PackageResponse =
        serde_json::from_str(body).context("decoding package_show response")?;
    match resp.result {
        Some(pkg) if resp.success => Ok(pkg),
        _ => bail!("package_show returned success={} with no result", resp.success),
    }
}

/// Keep resources whose name matches any of `required`. An empty filter
/// keeps everything.
pub fn filter_resources(resources: Vec<ResourceMeta>, required: &[Regex]) -> Vec<ResourceMeta> {
    if required.is_empty() {
        return resources;
    }
    resources
        .into_iter()
        .filter(|r| {
            let keep = required.iter().any(|re| re.is_match(&r.name));
            if !keep {
                debug!(resource = %r.name, "not required, skipping");
            }
            keep
        })
        .collect()
}

async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    Ok(bytes.to_vec())
}

#[instrument(level = "info", skip(client))]
pub async fn fetch_package(client: &Client, package_url: &str, package_id: &str) -> Result<Package> {
    let url = package_show_url(package_url, package_id)?;
    let body = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))?;
    let pkg = parse_package(&body)?;
    info!(package = %pkg.name, resources = pkg.resources.len(), "package listed");
    Ok(pkg)
}

/// Download `resources` a few at a time. The result keeps the input order
/// whatever order the downloads finish in.
pub async fn download_all(client: &Client, resources: Vec<ResourceMeta>) -> Result<Vec<Resource>> {
    stream::iter(resources)
        .map(|meta| async move {
            let start = Instant::now();
            info!(resource = %meta.name, "downloading");
            let bytes = get_bytes(client, &meta.url).await?;
            info!(resource = %meta.name, bytes = bytes.len(), elapsed = ?start.elapsed(), "downloaded");
            Ok::<_, anyhow::Error>(Resource::from_bytes(meta.name, &meta.format, bytes))
        })
        .buffered(MAX_CONCURRENCY)
        .try_collect()
        .await
}
