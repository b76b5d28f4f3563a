//! Gamma API client — market metadata for category classification
//!
//! Resolves a market slug to its tag labels via `gamma-api.polymarket.com`.
//! The first non-"All" tag is the market's category.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const GAMMA_URL: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Deserialize)]
struct GammaMarket {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GammaTag {
    label: Option<String>,
}

#[derive(Clone)]
pub struct GammaClient {
    client: Client,
}

impl GammaClient {
    pub fn new(proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(std::time::Duration::from_secs(30));
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self.client.get(url).query(params).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error {status} for {url}: {body}");
        }
        Ok(resp.json().await?)
    }

    /// Tag labels for a market slug, "All" filtered out. Empty when the
    /// market or its tags cannot be resolved.
    pub async fn get_market_tags(&self, slug: &str) -> Result<Vec<String>> {
        if slug.is_empty() {
            return Ok(Vec::new());
        }

        let markets: Vec<GammaMarket> = self
            .get_json(&format!("{GAMMA_URL}/markets"), &[("slug", slug)])
            .await?;
        let Some(market_id) = markets.into_iter().next().and_then(|m| m.id) else {
            debug!(slug, "No gamma market for slug");
            return Ok(Vec::new());
        };

        let tags: Vec<GammaTag> = self
            .get_json(&format!("{GAMMA_URL}/markets/{market_id}/tags"), &[])
            .await?;
        Ok(tags
            .into_iter()
            .filter_map(|t| t.label)
            .filter(|label| label != "All")
            .collect())
    }
}
