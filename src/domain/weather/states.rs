/// A US state (or DC) with a representative forecast point at its capital
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsState {
    pub code: &'static str,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

const fn state(code: &'static str, name: &'static str, latitude: f64, longitude: f64) -> UsState {
    UsState {
        code,
        name,
        latitude,
        longitude,
    }
}

pub static US_STATES: [UsState; 51] = [
    state("AL", "Alabama", 32.377, -86.300),
    state("AK", "Alaska", 58.301, -134.420),
    state("AZ", "Arizona", 33.448, -112.097),
    state("AR", "Arkansas", 34.746, -92.289),
    state("CA", "California", 38.576, -121.494),
    state("CO", "Colorado", 39.739, -104.985),
    state("CT", "Connecticut", 41.764, -72.682),
    state("DE", "Delaware", 39.157, -75.520),
    state("DC", "District of Columbia", 38.895, -77.036),
    state("FL", "Florida", 30.438, -84.281),
    state("GA", "Georgia", 33.749, -84.388),
    state("HI", "Hawaii", 21.307, -157.857),
    state("ID", "Idaho", 43.618, -116.215),
    state("IL", "Illinois", 39.798, -89.654),
    state("IN", "Indiana", 39.768, -86.162),
    state("IA", "Iowa", 41.591, -93.604),
    state("KS", "Kansas", 39.048, -95.678),
    state("KY", "Kentucky", 38.187, -84.875),
    state("LA", "Louisiana", 30.457, -91.187),
    state("ME", "Maine", 44.307, -69.782),
    state("MD", "Maryland", 38.979, -76.491),
    state("MA", "Massachusetts", 42.358, -71.064),
    state("MI", "Michigan", 42.734, -84.556),
    state("MN", "Minnesota", 44.955, -93.102),
    state("MS", "Mississippi", 32.304, -90.182),
    state("MO", "Missouri", 38.579, -92.173),
    state("MT", "Montana", 46.586, -112.018),
    state("NE", "Nebraska", 40.808, -96.700),
    state("NV", "Nevada", 39.164, -119.766),
    state("NH", "New Hampshire", 43.207, -71.538),
    state("NJ", "New Jersey", 40.220, -74.770),
    state("NM", "New Mexico", 35.682, -105.940),
    state("NY", "New York", 42.653, -73.757),
    state("NC", "North Carolina", 35.780, -78.639),
    state("ND", "North Dakota", 46.821, -100.783),
    state("OH", "Ohio", 39.961, -82.999),
    state("OK", "Oklahoma", 35.492, -97.503),
    state("OR", "Oregon", 44.938, -123.030),
    state("PA", "Pennsylvania", 40.264, -76.884),
    state("RI", "Rhode Island", 41.831, -71.415),
    state("SC", "South Carolina", 34.000, -81.033),
    state("SD", "South Dakota", 44.367, -100.346),
    state("TN", "Tennessee", 36.166, -86.784),
    state("TX", "Texas", 30.275, -97.740),
    state("UT", "Utah", 40.777, -111.888),
    state("VT", "Vermont", 44.262, -72.580),
    state("VA", "Virginia", 37.539, -77.434),
    state("WA", "Washington", 47.036, -122.905),
    state("WV", "West Virginia", 38.336, -81.612),
    state("WI", "Wisconsin", 43.075, -89.384),
    state("WY", "Wyoming", 41.140, -104.820),
];

/// Finds a state by two-letter code or full name, ignoring case
pub fn lookup_state(name: &str) -> Option<&'static UsState> {
    let needle = name.trim();
    US_STATES
        .iter()
        .find(|s| s.code.eq_ignore_ascii_case(needle) || s.name.eq_ignore_ascii_case(needle))
}
