use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::ports::{CapabilityError, WeatherCapability};
use crate::domain::weather::{Coordinates, ForecastPeriod, UsState, WeatherAlert};

pub const DEFAULT_NWS_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "nlip-agents/0.1 (weather worker)";
pub const DEFAULT_NWS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    #[serde(default)]
    properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    event: Option<String>,
    area_desc: Option<String>,
    severity: Option<String>,
    headline: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
}

impl From<AlertProperties> for WeatherAlert {
    fn from(props: AlertProperties) -> Self {
        let unknown = || "Unknown".to_string();
        WeatherAlert {
            event: props.event.unwrap_or_else(unknown),
            area: props.area_desc.unwrap_or_else(unknown),
            severity: props.severity.unwrap_or_else(unknown),
            headline: props.headline,
            description: props
                .description
                .unwrap_or_else(|| "No description available".to_string()),
            instruction: props.instruction,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    properties: PointProperties,
}

#[derive(Debug, Deserialize)]
struct PointProperties {
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<NwsPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsPeriod {
    #[serde(default)]
    name: String,
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    temperature_unit: String,
    #[serde(default)]
    wind_speed: String,
    #[serde(default)]
    wind_direction: String,
    #[serde(default)]
    detailed_forecast: String,
}

impl From<NwsPeriod> for ForecastPeriod {
    fn from(p: NwsPeriod) -> Self {
        ForecastPeriod {
            name: p.name,
            temperature: p.temperature,
            temperature_unit: p.temperature_unit,
            wind_speed: p.wind_speed,
            wind_direction: p.wind_direction,
            detailed_forecast: p.detailed_forecast,
        }
    }
}

/// Weather capability backed by the US National Weather Service API
///
/// `timeout` bounds one whole lookup; a forecast's two upstream calls share it.
pub struct NwsWeatherClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl NwsWeatherClient {
    /// Creates a client; the NWS API rejects requests without a User-Agent
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn bounded<T>(
        &self,
        target: &str,
        lookup: impl Future<Output = Result<T, CapabilityError>>,
    ) -> Result<T, CapabilityError> {
        tokio::time::timeout(self.timeout, lookup)
            .await
            .unwrap_or_else(|_| {
                Err(CapabilityError::Upstream(format!(
                    "NWS lookup for {} timed out after {:?}",
                    target, self.timeout
                )))
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, target: &str) -> Result<T, CapabilityError> {
        debug!(url, "NWS request");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/geo+json")
            .send()
            .await
            .map_err(|e| CapabilityError::Upstream(format!("request to {} failed: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| CapabilityError::Upstream(format!("unreadable NWS response: {}", e))),
            StatusCode::NOT_FOUND => Err(CapabilityError::NoData(target.to_string())),
            status => Err(CapabilityError::Upstream(format!("NWS returned HTTP {}", status))),
        }
    }
}

#[async_trait]
impl WeatherCapability for NwsWeatherClient {
    #[instrument(skip(self, state), fields(state = state.code))]
    async fn alerts(&self, state: &UsState) -> Result<Vec<WeatherAlert>, CapabilityError> {
        let url = format!("{}/alerts/active/area/{}", self.base_url, state.code);
        let collection: AlertCollection = self
            .bounded(state.name, self.get_json(&url, state.name))
            .await?;

        Ok(collection
            .features
            .into_iter()
            .map(|feature| feature.properties.into())
            .collect())
    }

    #[instrument(skip(self, point), fields(point = %point))]
    async fn forecast(&self, point: Coordinates) -> Result<Vec<ForecastPeriod>, CapabilityError> {
        let target = point.to_string();
        let forecast: ForecastResponse = self
            .bounded(&target, async {
                let url = format!("{}/points/{}", self.base_url, target);
                let points: PointResponse = self.get_json(&url, &target).await?;

                let forecast_url = points
                    .properties
                    .forecast
                    .ok_or_else(|| CapabilityError::NoData(target.clone()))?;
                self.get_json(&forecast_url, &target).await
            })
            .await?;

        if forecast.properties.periods.is_empty() {
            return Err(CapabilityError::NoData(target));
        }

        Ok(forecast
            .properties
            .periods
            .into_iter()
            .take(5)
            .map(ForecastPeriod::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::lookup_state;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> NwsWeatherClient {
        NwsWeatherClient::new(server.uri(), DEFAULT_USER_AGENT, DEFAULT_NWS_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn alerts_map_feature_properties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active/area/CA"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [
                    { "properties": {
                        "event": "Red Flag Warning",
                        "areaDesc": "Sacramento Valley",
                        "severity": "Severe",
                        "description": "Gusty winds",
                        "instruction": "Avoid outdoor burning"
                    } },
                    { "properties": {} }
                ]
            })))
            .mount(&server)
            .await;

        let alerts = client(&server)
            .alerts(lookup_state("CA").unwrap())
            .await
            .unwrap();

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].event, "Red Flag Warning");
        assert_eq!(alerts[0].area, "Sacramento Valley");
        assert_eq!(alerts[1].event, "Unknown");
    }

    #[tokio::test]
    async fn no_active_alerts_is_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active/area/TX"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": [] })))
            .mount(&server)
            .await;

        let alerts = client(&server)
            .alerts(lookup_state("TX").unwrap())
            .await
            .unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn forecast_follows_points_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/points/39.1612,-86.5264"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": { "forecast": format!("{}/gridpoints/IND/50,40/forecast", server.uri()) }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gridpoints/IND/50,40/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": { "periods": [{
                    "name": "Tonight",
                    "temperature": 58,
                    "temperatureUnit": "F",
                    "windSpeed": "5 mph",
                    "windDirection": "S",
                    "detailedForecast": "Mostly clear"
                }] }
            })))
            .mount(&server)
            .await;

        let periods = client(&server)
            .forecast(Coordinates::new(39.1612, -86.5264).unwrap())
            .await
            .unwrap();

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].temperature, 58.0);
        assert_eq!(periods[0].detailed_forecast, "Mostly clear");
    }

    #[tokio::test]
    async fn unknown_point_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .forecast(Coordinates::new(10.0, 10.0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::NoData(_)));
    }

    #[tokio::test]
    async fn slow_forecast_fails_within_one_lookup_bound() {
        let server = MockServer::start().await;
        let delay = Duration::from_millis(150);
        Mock::given(method("GET"))
            .and(path("/points/39.1612,-86.5264"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "properties": { "forecast": format!("{}/gridpoints/IND/50,40/forecast", server.uri()) }
                    }))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gridpoints/IND/50,40/forecast"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "properties": { "periods": [] } }))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;

        // each call fits the bound, both together do not
        let client = NwsWeatherClient::new(server.uri(), DEFAULT_USER_AGENT, Duration::from_millis(250))
            .unwrap();
        let err = client
            .forecast(Coordinates::new(39.1612, -86.5264).unwrap())
            .await
            .unwrap_err();

        match err {
            CapabilityError::Upstream(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected upstream timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .alerts(lookup_state("OH").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Upstream(_)));
    }
}
