pub mod health;
pub mod nlip;

pub use health::health_check;
pub use nlip::{receive, NlipAgent};
