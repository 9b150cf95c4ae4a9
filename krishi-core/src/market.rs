//! Mandi price lookup with a static fallback table.

use chrono::{NaiveDate, Utc};

use crate::{
    model::{DataSource, MandiPrice, MarketReport, Sourced, Trend},
    provider::MarketProvider,
};

pub const FALLBACK_WARNING: &str = "Using mock data due to API error";

struct MockCommodity {
    key: &'static str,
    name: &'static str,
    trend: Trend,
    // (market, min, max, modal)
    mandis: [(&'static str, f64, f64, f64); 3],
}

static MOCK_TABLE: [MockCommodity; 5] = [
    MockCommodity {
        key: "wheat",
        name: "Wheat",
        trend: Trend::Rising,
        mandis: [
            ("Delhi (Azadpur)", 2150.0, 2250.0, 2200.0),
            ("Punjab (Khanna)", 2100.0, 2200.0, 2150.0),
            ("Haryana (Karnal)", 2120.0, 2220.0, 2170.0),
        ],
    },
    MockCommodity {
        key: "rice",
        name: "Rice",
        trend: Trend::Stable,
        mandis: [
            ("Andhra Pradesh (Kurnool)", 1850.0, 1950.0, 1900.0),
            ("West Bengal (Burdwan)", 1800.0, 1900.0, 1850.0),
            ("Tamil Nadu (Thanjavur)", 1820.0, 1920.0, 1870.0),
        ],
    },
    MockCommodity {
        key: "tomato",
        name: "Tomato",
        trend: Trend::Falling,
        mandis: [
            ("Maharashtra (Pune)", 25.0, 35.0, 30.0),
            ("Karnataka (Bangalore)", 20.0, 30.0, 25.0),
            ("Tamil Nadu (Coimbatore)", 22.0, 32.0, 27.0),
        ],
    },
    MockCommodity {
        key: "onion",
        name: "Onion",
        trend: Trend::Rising,
        mandis: [
            ("Maharashtra (Lasalgaon)", 1800.0, 2000.0, 1900.0),
            ("Karnataka (Hassan)", 1700.0, 1900.0, 1800.0),
            ("Gujarat (Rajkot)", 1750.0, 1950.0, 1850.0),
        ],
    },
    MockCommodity {
        key: "potato",
        name: "Potato",
        trend: Trend::Stable,
        mandis: [
            ("Uttar Pradesh (Agra)", 12.0, 18.0, 15.0),
            ("West Bengal (Hooghly)", 10.0, 16.0, 13.0),
            ("Punjab (Jalandhar)", 11.0, 17.0, 14.0),
        ],
    },
];

/// Canned prices for `commodity`; unknown commodities get the wheat table.
pub fn mock_report(commodity: &str, today: NaiveDate) -> MarketReport {
    let wanted = commodity.trim().to_lowercase();
    let entry = MOCK_TABLE
        .iter()
        .find(|c| c.key == wanted)
        .unwrap_or(&MOCK_TABLE[0]);

    MarketReport {
        commodity: entry.name.to_string(),
        mandi_prices: entry
            .mandis
            .iter()
            .map(|&(market, min, max, modal)| MandiPrice {
                market: market.to_string(),
                min,
                max,
                modal,
                date: today,
            })
            .collect(),
        trend: entry.trend,
    }
}

/// Look up prices. Never fails: upstream errors degrade to the mock table.
pub async fn lookup(provider: Option<&dyn MarketProvider>, commodity: &str) -> Sourced<MarketReport> {
    let today = Utc::now().date_naive();

    let Some(provider) = provider else {
        tracing::info!(commodity, "market API not configured, returning mock data");
        return Sourced::new(mock_report(commodity, today), DataSource::Mock);
    };

    match provider.prices(commodity).await {
        Ok(report) => Sourced::new(report, DataSource::Api),
        Err(err) => {
            tracing::warn!(commodity, error = %err, "market API call failed, returning mock data");
            Sourced::new(mock_report(commodity, today), DataSource::Fallback)
                .with_warning(FALLBACK_WARNING)
        }
    }
}
