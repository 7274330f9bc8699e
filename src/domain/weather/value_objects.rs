use serde::{Deserialize, Serialize};

use super::states::{lookup_state, UsState};

/// Kind of weather lookup a subtask asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherAction {
    Alerts,
    Forecast,
}

impl WeatherAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alerts" | "alert" | "get_weather_alerts" => Some(WeatherAction::Alerts),
            "forecast" | "get_weather_forecast" => Some(WeatherAction::Forecast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherAction::Alerts => "alerts",
            WeatherAction::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for WeatherAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Parses `"lat,lon"`, tolerating whitespace around either number
    pub fn parse(raw: &str) -> Option<Self> {
        let (lat, lon) = raw.split_once(',')?;
        Self::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// A location resolved into something the weather capability can serve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    State(&'static UsState),
    Point(Coordinates),
}

impl Target {
    /// Resolves a state name or code, a `"lat,lon"` pair, or a place
    /// qualified by its state (`"Bloomington, Indiana"`), which resolves to
    /// that state
    pub fn resolve(location: &str) -> Option<Self> {
        if let Some(point) = Coordinates::parse(location) {
            return Some(Target::Point(point));
        }
        lookup_state(location)
            .or_else(|| {
                let (_, state) = location.rsplit_once(',')?;
                lookup_state(state)
            })
            .map(Target::State)
    }

    /// Point used for forecasts; states map to their capital
    pub fn coordinates(&self) -> Coordinates {
        match self {
            Target::State(state) => Coordinates {
                latitude: state.latitude,
                longitude: state.longitude,
            },
            Target::Point(point) => *point,
        }
    }

    pub fn state(&self) -> Option<&'static UsState> {
        match self {
            Target::State(state) => Some(state),
            Target::Point(_) => None,
        }
    }
}

/// An active weather alert for an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub area: String,
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// One period of a point forecast (e.g. "Tonight")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub temperature: f64,
    pub temperature_unit: String,
    pub wind_speed: String,
    pub wind_direction: String,
    pub detailed_forecast: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parsing_accepts_tool_names() {
        assert_eq!(WeatherAction::parse("ALERTS"), Some(WeatherAction::Alerts));
        assert_eq!(
            WeatherAction::parse("get_weather_forecast"),
            Some(WeatherAction::Forecast)
        );
        assert_eq!(WeatherAction::parse("radar"), None);
    }

    #[test]
    fn coordinates_parse_and_validate() {
        let point = Coordinates::parse("39.1612, -86.5264").unwrap();
        assert_eq!(point.latitude, 39.1612);
        assert!(Coordinates::parse("200,0").is_none());
        assert!(Coordinates::parse("north").is_none());
    }

    #[test]
    fn target_resolution_prefers_coordinates_then_states() {
        assert!(matches!(Target::resolve("39.1,-86.5"), Some(Target::Point(_))));
        let target = Target::resolve("Indiana").unwrap();
        assert_eq!(target.state().unwrap().code, "IN");
        assert!((target.coordinates().latitude - 39.768).abs() < 1e-9);
        assert!(Target::resolve("Atlantis").is_none());
    }

    #[test]
    fn qualified_place_resolves_to_its_state() {
        let target = Target::resolve("Bloomington, Indiana").unwrap();
        assert_eq!(target.state().unwrap().code, "IN");
        assert_eq!(Target::resolve("Springfield, IL").unwrap().state().unwrap().name, "Illinois");
        assert!(Target::resolve("Bloomington, Narnia").is_none());
    }
}
