//! Command line and environment configuration
//!
//! Every option can also be supplied through the environment (a `.env` file
//! is loaded first by the binary).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::agents::{DelegationPolicy, DEFAULT_WORKER_CONCURRENCY};
use crate::domain::ports::Reasoner;
use crate::infrastructure::{
    KeywordReasoner, LlmReasoner, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, DEFAULT_LLM_TIMEOUT,
    DEFAULT_NWS_BASE_URL, DEFAULT_NWS_TIMEOUT, DEFAULT_USER_AGENT,
};

pub const DEFAULT_COORDINATOR_ADDR: &str = "0.0.0.0:8010";
pub const DEFAULT_WORKER_ADDR: &str = "0.0.0.0:8012";
pub const DEFAULT_WORKER_ENDPOINT: &str = "http://127.0.0.1:8012/nlip/";
pub const DEFAULT_COORDINATOR_ENDPOINT: &str = "http://127.0.0.1:8010/nlip/";

#[derive(Debug, Parser)]
#[command(name = "nlip-agents")]
#[command(about = "Coordinator and worker agents speaking the NLIP message protocol")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the coordinator agent
    Coordinator(CoordinatorArgs),
    /// Serve the weather worker agent
    Worker(WorkerArgs),
    /// Send one text query to an agent and print the reply
    Send(SendArgs),
}

/// Reasoning engine selection shared by both agents
#[derive(Debug, Clone, Args)]
pub struct ReasonerArgs {
    /// API key for an OpenAI-compatible chat endpoint; keyword matching is used without one
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    /// Bound on one completion; a stalled engine becomes a reasoning failure
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = DEFAULT_LLM_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub llm_timeout_secs: u64,
}

impl ReasonerArgs {
    pub fn uses_llm(&self) -> bool {
        self.llm_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn build(&self) -> Result<Arc<dyn Reasoner>, reqwest::Error> {
        match self.llm_api_key.as_deref() {
            Some(key) if self.uses_llm() => Ok(Arc::new(
                LlmReasoner::new(key.trim(), Duration::from_secs(self.llm_timeout_secs))?
                    .with_base_url(self.llm_base_url.clone())
                    .with_model(self.llm_model.clone()),
            )),
            _ => Ok(Arc::new(KeywordReasoner::new())),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CoordinatorArgs {
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_COORDINATOR_ADDR)]
    pub bind: SocketAddr,

    /// Protocol endpoint of the worker agent
    #[arg(long, env = "WORKER_ENDPOINT", default_value = DEFAULT_WORKER_ENDPOINT)]
    pub worker_endpoint: String,

    /// Per-attempt timeout for one subtask
    #[arg(long, env = "SUBTASK_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries after an unreachable or timed-out attempt
    #[arg(long, env = "MAX_RETRIES", default_value_t = 1)]
    pub max_retries: u32,

    #[arg(long, env = "RETRY_BACKOFF_MS", default_value_t = 250)]
    pub retry_backoff_ms: u64,

    /// Subtasks delegated per request; the rest are reported as skipped
    #[arg(long, env = "MAX_SUBTASKS", default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_subtasks: u32,

    /// Subtasks in flight at once
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrency: u32,

    #[command(flatten)]
    pub reasoner: ReasonerArgs,
}

impl CoordinatorArgs {
    pub fn policy(&self) -> DelegationPolicy {
        DelegationPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_subtasks: self.max_subtasks as usize,
            max_concurrency: self.max_concurrency as usize,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_WORKER_ADDR)]
    pub bind: SocketAddr,

    #[arg(long, env = "NWS_BASE_URL", default_value = DEFAULT_NWS_BASE_URL)]
    pub nws_base_url: String,

    /// User-Agent sent to the weather service, which requires one
    #[arg(long, env = "NWS_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub nws_user_agent: String,

    /// Bound on one weather lookup, all upstream calls included; keep it
    /// below the coordinator's SUBTASK_TIMEOUT_SECS
    #[arg(long, env = "NWS_TIMEOUT_SECS", default_value_t = DEFAULT_NWS_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub nws_timeout_secs: u64,

    /// Lookups in flight at once for one request
    #[arg(long, env = "WORKER_CONCURRENCY", default_value_t = DEFAULT_WORKER_CONCURRENCY as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub worker_concurrency: u32,

    #[command(flatten)]
    pub reasoner: ReasonerArgs,
}

impl WorkerArgs {
    pub fn nws_timeout(&self) -> Duration {
        Duration::from_secs(self.nws_timeout_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SendArgs {
    /// Protocol endpoint to send to
    #[arg(long, default_value = DEFAULT_COORDINATOR_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Session to attach the message to
    #[arg(long)]
    pub session_id: Option<String>,

    /// Pretty-print the reply
    #[arg(long)]
    pub pretty: bool,

    /// Query text, e.g. "Weather alerts for California and Texas?"
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

impl SendArgs {
    pub fn query(&self) -> String {
        self.query.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_flags_build_policy() {
        let cli = Cli::try_parse_from([
            "nlip-agents",
            "coordinator",
            "--worker-endpoint",
            "http://worker:9000/nlip/",
            "--timeout-secs",
            "5",
            "--max-retries",
            "3",
            "--max-concurrency",
            "2",
        ])
        .unwrap();

        let Command::Coordinator(args) = cli.command else {
            panic!("expected coordinator command");
        };
        assert_eq!(args.worker_endpoint, "http://worker:9000/nlip/");

        let policy = args.policy();
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_concurrency, 2);
        assert_eq!(policy.max_subtasks, 16);
        assert_eq!(policy.retry_backoff, Duration::from_millis(250));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = Cli::try_parse_from(["nlip-agents", "coordinator", "--max-concurrency", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn worker_lookup_bounds_default_below_subtask_timeout() {
        let cli = Cli::try_parse_from(["nlip-agents", "worker"]).unwrap();
        let Command::Worker(args) = cli.command else {
            panic!("expected worker command");
        };
        assert_eq!(args.worker_concurrency as usize, DEFAULT_WORKER_CONCURRENCY);
        assert!(args.nws_timeout() < DelegationPolicy::default().timeout);

        let cli = Cli::try_parse_from([
            "nlip-agents",
            "worker",
            "--nws-timeout-secs",
            "3",
            "--worker-concurrency",
            "2",
        ])
        .unwrap();
        let Command::Worker(args) = cli.command else {
            panic!("expected worker command");
        };
        assert_eq!(args.nws_timeout(), Duration::from_secs(3));
        assert_eq!(args.worker_concurrency, 2);
    }

    #[test]
    fn llm_timeout_is_configurable() {
        let cli = Cli::try_parse_from([
            "nlip-agents",
            "coordinator",
            "--llm-timeout-secs",
            "7",
        ])
        .unwrap();
        let Command::Coordinator(args) = cli.command else {
            panic!("expected coordinator command");
        };
        assert_eq!(args.reasoner.llm_timeout_secs, 7);
        assert!(Cli::try_parse_from(["nlip-agents", "worker", "--llm-timeout-secs", "0"]).is_err());
    }

    #[test]
    fn send_joins_query_words() {
        let cli = Cli::try_parse_from([
            "nlip-agents",
            "send",
            "Weather",
            "alerts",
            "for",
            "Texas?",
        ])
        .unwrap();

        let Command::Send(args) = cli.command else {
            panic!("expected send command");
        };
        assert_eq!(args.query(), "Weather alerts for Texas?");
        assert_eq!(args.endpoint, DEFAULT_COORDINATOR_ENDPOINT);
    }

    #[test]
    fn blank_api_key_falls_back_to_keywords() {
        let args = ReasonerArgs {
            llm_api_key: Some("  ".into()),
            llm_base_url: DEFAULT_LLM_BASE_URL.into(),
            llm_model: DEFAULT_LLM_MODEL.into(),
            llm_timeout_secs: 20,
        };
        assert!(!args.uses_llm());
    }
}
