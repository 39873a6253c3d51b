use std::collections::HashMap;
use std::time::Duration;
use async_trait::async_trait;
use chrono::DateTime;
use futures::future::join_all;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use crate::config::QuoteSourceConfig;
use crate::error::{Error, Result};
use crate::interfaces::quote_source::QuoteSource;
use crate::types::series::{PricePoint, PriceSeries};

/// Daily closes from Yahoo Finance's v8 chart endpoint, one request per symbol.
pub struct YahooConnector {
    source_id: String,
    client: reqwest::Client,
    base_url: String,
}

impl YahooConnector {
    pub fn new(config: &QuoteSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(YahooConnector {
            source_id: "yahoo".to_string(),
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    fn chart_url(&self, symbol: &str, lookback_days: u32) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("invalid quote source URL {}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| Error::ConfigError(format!("quote source URL cannot be a base: {}", self.base_url)))?
            .push(symbol);

        url.query_pairs_mut()
            .append_pair("range", &format!("{}d", lookback_days))
            .append_pair("interval", "1d");

        Ok(url)
    }

    /// `Ok(None)` when the provider does not know the symbol.
    async fn fetch_symbol(&self, symbol: &str, lookback_days: u32) -> Result<Option<PriceSeries>> {
        let url = self.chart_url(symbol, lookback_days)?;

        let response = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::TransportError(format!("{}: {}", symbol, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Symbol unknown to {}: {}", self.source_id, symbol);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::TransportError(format!("{}: HTTP {}", symbol, status)));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamDataError(format!("{}: {}", symbol, e)))?;

        parse_chart(symbol, body)
    }
}

#[async_trait]
impl QuoteSource for YahooConnector {
    async fn fetch(&self, symbols: &[String], lookback_days: u32) -> Result<HashMap<String, PriceSeries>> {
        let results = join_all(
            symbols.iter().map(|s| self.fetch_symbol(s, lookback_days))
        ).await;

        let mut series = HashMap::new();
        let mut first_error = None;
        let mut failures = 0;

        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(Some(s)) => {
                    series.insert(symbol.clone(), s);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Fetch from {} failed for {}: {}", self.source_id, symbol, e);
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        // Only a failure of every requested symbol is surfaced as an error.
        match first_error {
            Some(e) if failures == symbols.len() => Err(e),
            _ => Ok(series),
        }
    }
}

fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Option<PriceSeries>> {
    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => Ok(None),
                Some(err) => Err(Error::UpstreamDataError(format!(
                    "{}: {}: {}", symbol, err.code, err.description
                ))),
                None => Err(Error::UpstreamDataError(format!("{}: empty result with no error", symbol))),
            };
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Some(PriceSeries::empty()));
    };

    // No trading in the window
    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data.indicators.quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let points = timestamps.iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close?;
            let timestamp = DateTime::from_timestamp(ts, 0)?;
            Some(PricePoint::new(timestamp, close))
        })
        .collect();

    Ok(Some(points))
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
