use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{UpstreamError, truncate_body},
    model::{MandiPrice, MarketReport, Trend},
};

use super::{MarketProvider, ProviderId};

pub const MARKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an Agmarknet-style mandi price API reached at a configured URL.
#[derive(Debug, Clone)]
pub struct MarketApiProvider {
    api_key: String,
    url: String,
    http: Client,
}

impl MarketApiProvider {
    pub fn new(api_key: String, url: String) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(MARKET_TIMEOUT).build()?;
        Ok(Self { api_key, url, http })
    }
}

/// Upstream prices arrive as numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Price {
    Number(f64),
    Text(String),
}

impl Price {
    fn value(price: Option<Price>) -> f64 {
        match price {
            Some(Price::Number(n)) => n,
            Some(Price::Text(s)) => s.trim().parse().unwrap_or(0.0),
            None => 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamMandi {
    market: Option<String>,
    mandi_name: Option<String>,
    min_price: Option<Price>,
    max_price: Option<Price>,
    modal_price: Option<Price>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamMarket {
    commodity: Option<String>,
    mandi_prices: Option<Vec<UpstreamMandi>>,
    trend: Option<Trend>,
}

/// Agmarknet and data.gov.in report `dd/mm/yyyy`; other feeds use ISO dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

fn parse_date(raw: &str, today: NaiveDate) -> NaiveDate {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .unwrap_or_else(|| {
            tracing::warn!(date = raw, "unrecognized mandi price date, using today");
            today
        })
}

fn into_report(raw: UpstreamMarket, requested: &str, today: NaiveDate) -> MarketReport {
    let mandi_prices = raw
        .mandi_prices
        .unwrap_or_default()
        .into_iter()
        .map(|m| MandiPrice {
            market: m
                .market
                .or(m.mandi_name)
                .unwrap_or_else(|| "Unknown".to_string()),
            min: Price::value(m.min_price),
            max: Price::value(m.max_price),
            modal: Price::value(m.modal_price),
            date: m.date.as_deref().map_or(today, |d| parse_date(d, today)),
        })
        .collect();

    MarketReport {
        commodity: raw
            .commodity
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| requested.to_string()),
        mandi_prices,
        trend: raw.trend.unwrap_or_default(),
    }
}

#[async_trait]
impl MarketProvider for MarketApiProvider {
    async fn prices(&self, commodity: &str) -> Result<MarketReport, UpstreamError> {
        let res = self
            .http
            .get(&self.url)
            .query(&[("commodity", commodity), ("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::Market, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::Market, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: ProviderId::Market,
                status,
                body: truncate_body(&body),
            });
        }

        let raw: UpstreamMarket = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::decode(ProviderId::Market, e.to_string()))?;

        Ok(into_report(raw, commodity, Utc::now().date_naive()))
    }
}
