pub mod states;
pub mod value_objects;

pub use states::{lookup_state, UsState, US_STATES};
pub use value_objects::{Coordinates, ForecastPeriod, Target, WeatherAction, WeatherAlert};
