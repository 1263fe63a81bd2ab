//! Host-side logic for xlayer-dispute execution challenges

pub mod config;
pub mod cancel;
pub mod error;
pub mod client;
pub mod ledger;
pub mod rpc;
pub mod challenge;
pub mod challenger;

pub use config::ChallengerConfig;
pub use cancel::CancelToken;
pub use error::{ChallengeError, InvariantViolation};
pub use client::{BisectionMove, DisputeClient, OneStepProofMove, SubmissionError, TxRef};
pub use ledger::InMemoryLedger;
pub use rpc::RpcDisputeClient;
pub use challenge::{Divergence, ExecutionChallenge};
pub use challenger::{Challenger, Move};
