//! NLIP Agents Library
//!
//! This library provides the core functionality for the NLIP coordinator and
//! worker agents, including the protocol message model, the agents, and the
//! HTTP and weather adapters they run on.

pub mod agents;
pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
