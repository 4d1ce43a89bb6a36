//! One-shot fetch through the same pipeline the HTTP routes use.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::models::{Config, StockResource};
use crate::infrastructure::upstream::{UpstreamClient, UpstreamClientConfig};
use crate::services::{CachedProxy, ProxyRequest, ProxyResponse};

/// Rate-limit identity used for command-line requests
const CLI_CLIENT_KEY: &str = "cli";

/// Handle `fonpick fetch`
pub async fn handle_fetch(
    config: &Config,
    symbol: String,
    resource: &str,
    years: Option<u32>,
    nocache: bool,
    json: bool,
) -> Result<()> {
    let client = UpstreamClient::new(UpstreamClientConfig::from_config(config))
        .context("Failed to build upstream client")?;
    let proxy = CachedProxy::from_config(Arc::new(client), config);

    if resource.eq_ignore_ascii_case("verdict") {
        let response = proxy
            .handle_verdict(symbol, nocache, CLI_CLIENT_KEY.to_string())
            .await;
        return print_envelope(&response, json);
    }

    let Some(resource) = StockResource::from_name(resource, years) else {
        bail!(
            "Unknown resource '{resource}'. Expected one of: overview, statistics, valuation, quarterly, yearly, verdict"
        );
    };

    let response = proxy
        .handle(ProxyRequest {
            raw_symbol: symbol,
            resource,
            nocache,
            client_key: CLI_CLIENT_KEY.to_string(),
        })
        .await;
    print_envelope(&response, json)
}

fn print_envelope<V: Serialize>(response: &ProxyResponse<V>, json: bool) -> Result<()> {
    let rendered = if json {
        serde_json::to_string(&response.envelope)?
    } else {
        serde_json::to_string_pretty(&response.envelope)?
    };
    println!("{rendered}");

    if !response.envelope.success {
        bail!("Request failed with status {}", response.status);
    }
    Ok(())
}
