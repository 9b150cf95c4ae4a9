//! Weather reports and the farming alerts derived from them.

use crate::{
    error::UpstreamError,
    model::{Coordinates, DataSource, Severity, Sourced, WeatherAlert, WeatherObservation, WeatherReport},
    provider::WeatherProvider,
};

const HEATWAVE_ABOVE_C: f64 = 35.0;
const COLD_WAVE_BELOW_C: f64 = 10.0;
const HIGH_RAIN_ABOVE_PCT: u8 = 70;

pub fn derive_alerts(temp: f64, description: &str, rain_probability: u8) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();

    if description.to_lowercase().contains("rain") {
        alerts.push(WeatherAlert {
            event: "Heavy Rain Alert".to_string(),
            description: "Heavy rainfall expected. Consider postponing outdoor farming activities and ensure proper drainage.".to_string(),
            severity: Severity::Moderate,
        });
    }

    if temp > HEATWAVE_ABOVE_C {
        alerts.push(WeatherAlert {
            event: "Heatwave Alert".to_string(),
            description: "Extreme heat conditions detected. Ensure adequate irrigation and protect crops from heat stress.".to_string(),
            severity: Severity::High,
        });
    } else if temp < COLD_WAVE_BELOW_C {
        alerts.push(WeatherAlert {
            event: "Cold Wave Alert".to_string(),
            description: "Cold weather conditions detected. Consider protecting sensitive crops and adjusting irrigation schedules.".to_string(),
            severity: Severity::Moderate,
        });
    }

    if rain_probability > HIGH_RAIN_ABOVE_PCT {
        alerts.push(WeatherAlert {
            event: "High Rain Probability".to_string(),
            description: format!(
                "High probability of rain ({rain_probability}%). Plan irrigation and harvesting activities accordingly."
            ),
            severity: Severity::Low,
        });
    }

    alerts
}

/// Report served when no weather provider is configured.
pub fn sample_report() -> WeatherReport {
    WeatherReport {
        location: "Sample City".to_string(),
        temp: 25.5,
        description: "clear sky".to_string(),
        humidity: 65,
        rain_probability: 15,
        alerts: Vec::new(),
    }
}

pub fn into_report(obs: WeatherObservation) -> WeatherReport {
    // Halves round towards positive infinity: -0.25 becomes -0.2.
    let temp = ((obs.temperature_c * 10.0) + 0.5).floor() / 10.0;
    let alerts = derive_alerts(temp, &obs.description, obs.rain_probability_pct);

    WeatherReport {
        location: obs.location,
        temp,
        description: obs.description,
        humidity: obs.humidity_pct,
        rain_probability: obs.rain_probability_pct,
        alerts,
    }
}

pub async fn report(
    provider: Option<&dyn WeatherProvider>,
    coords: Coordinates,
) -> Result<Sourced<WeatherReport>, UpstreamError> {
    let Some(provider) = provider else {
        tracing::info!("weather provider not configured, returning sample data");
        return Ok(Sourced::new(sample_report(), DataSource::Sample));
    };

    tracing::info!(lat = coords.lat, lon = coords.lon, "fetching weather");
    let obs = provider.current(coords).await?;

    Ok(Sourced::new(into_report(obs), DataSource::OpenWeather))
}
