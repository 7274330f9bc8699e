// Domain layer module exports
// Following Hexagonal Architecture and DDD principles
// Domain is independent of transport, HTTP and reasoning-engine concerns

pub mod message;
pub mod ports;
pub mod weather;
