// Infrastructure layer module
// Contains the HTTP transport and external service integrations
// Follows Hexagonal Architecture

pub mod http_transport;
pub mod keyword_reasoner;
pub mod llm_reasoner;
pub mod nws_weather;

pub use http_transport::HttpTransport;
pub use keyword_reasoner::KeywordReasoner;
pub use llm_reasoner::{LlmReasoner, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, DEFAULT_LLM_TIMEOUT};
pub use nws_weather::{
    NwsWeatherClient, DEFAULT_NWS_BASE_URL, DEFAULT_NWS_TIMEOUT, DEFAULT_USER_AGENT,
};
