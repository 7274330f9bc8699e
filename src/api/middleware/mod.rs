pub mod nlip;

pub use nlip::NlipMessage;
