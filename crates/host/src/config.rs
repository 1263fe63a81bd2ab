//! Configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Challenger configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChallengerConfig {
    /// L1 RPC URL
    pub l1_rpc: String,
    /// Challenge contract address
    pub challenge_address: String,
    /// Sender address (unlocked account on the L1 node)
    pub challenger_address: String,
    /// Number of segments each bisection splits into
    pub bisection_degree: u64,
    /// Execute the instruction crossing a gas target during replay
    pub go_over_gas: bool,
    /// Receipt polling interval in seconds
    pub receipt_poll_secs: u64,
    /// Instructions in the simulated trace
    pub sim_trace_steps: u64,
    /// Instruction the simulated asserter gets wrong
    pub sim_fault_step: u64,
}

impl Default for ChallengerConfig {
    fn default() -> Self {
        Self {
            l1_rpc: "http://localhost:8545".to_string(),
            challenge_address: "0x0000000000000000000000000000000000000000".to_string(),
            challenger_address: "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC".to_string(),
            bisection_degree: 20,
            go_over_gas: true,
            receipt_poll_secs: 2,
            sim_trace_steps: 5000,
            sim_fault_step: 3217,
        }
    }
}

impl ChallengerConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            l1_rpc: env::var("L1_RPC").unwrap_or(defaults.l1_rpc),
            challenge_address: env::var("CHALLENGE_ADDRESS").unwrap_or(defaults.challenge_address),
            challenger_address: env::var("CHALLENGER_ADDRESS").unwrap_or(defaults.challenger_address),
            bisection_degree: env::var("BISECTION_DEGREE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|degree| *degree >= 2)
                .unwrap_or(defaults.bisection_degree),
            go_over_gas: env::var("GO_OVER_GAS")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.go_over_gas),
            receipt_poll_secs: env::var("RECEIPT_POLL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.receipt_poll_secs),
            sim_trace_steps: env::var("SIM_TRACE_STEPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sim_trace_steps),
            sim_fault_step: env::var("SIM_FAULT_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sim_fault_step),
        }
    }
}
