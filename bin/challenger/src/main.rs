//! Challenger binary
//!
//! Plays a full execution challenge locally: an honest challenger against an
//! asserter whose trace goes wrong at one instruction, both submitting to an
//! in-memory ledger.

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use xlayer_dispute_core::{
    Bisection, ChallengeSegment, InboxDeltaTable, Instruction, MachineReplayEngine, StepMachine,
};
use xlayer_dispute_host::{CancelToken, Challenger, ChallengerConfig, ExecutionChallenge, InMemoryLedger, Move};

/// Upper bound on moves before the game is considered stuck
const MAX_ROUNDS: usize = 128;

/// Deterministic program of `steps` instructions reading every inbox message
fn build_program(steps: u64, messages: usize) -> Vec<Instruction> {
    let mut program: Vec<Instruction> = (0..messages).map(|_| Instruction::ReadInbox).collect();
    for i in 0..steps {
        program.push(match i % 6 {
            0 => Instruction::Add(i),
            1 => Instruction::Mul(5),
            2 => Instruction::BufferWrite((i % 32) as u16),
            3 => Instruction::Log,
            4 => Instruction::Add(i / 2),
            _ => Instruction::Send,
        });
    }
    program
}

/// Same-cost variant of an instruction with a different effect on the register
fn tamper(instruction: Instruction) -> Option<Instruction> {
    match instruction {
        Instruction::Add(value) => Some(Instruction::Add(value ^ 0xdead)),
        // Stays odd, so the difference survives later multiplications
        Instruction::Mul(value) => Some(Instruction::Mul(value + 2)),
        _ => None,
    }
}

fn build_party(
    name: &str,
    program: Vec<Instruction>,
    inbox: &[Vec<u8>],
    config: &ChallengerConfig,
) -> Result<(Challenger, MachineReplayEngine<StepMachine>)> {
    let mut engine = MachineReplayEngine::new();
    let cursor = engine.insert_checkpoint(StepMachine::new(program, inbox.to_vec()))?;
    let challenge = ExecutionChallenge::new(cursor, InboxDeltaTable::from_messages(inbox));
    Ok((Challenger::from_config(name, challenge, config), engine))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("╔═══════════════════════════════════════════════╗");
    info!("║   xlayer-dispute Execution Challenge (local)  ║");
    info!("╚═══════════════════════════════════════════════╝");

    let config = ChallengerConfig::from_env();
    info!("");
    info!("Configuration:");
    info!("  Trace steps:      {}", config.sim_trace_steps);
    info!("  Faulty step:      {}", config.sim_fault_step);
    info!("  Bisection degree: {}", config.bisection_degree);
    info!("  Go over gas:      {}", config.go_over_gas);
    info!("");

    let inbox: Vec<Vec<u8>> = (0..3u8).map(|i| vec![i; 64]).collect();
    let honest_program = build_program(config.sim_trace_steps, inbox.len());
    let (fault_index, tampered) = honest_program
        .iter()
        .enumerate()
        .skip(inbox.len() + config.sim_fault_step as usize)
        .find_map(|(index, instruction)| tamper(*instruction).map(|t| (index, t)))
        .ok_or_else(|| anyhow!("SIM_FAULT_STEP {} outside the trace", config.sim_fault_step))?;
    let mut faulty_program = honest_program.clone();
    faulty_program[fault_index] = tampered;
    info!("Asserter executes {:?} at instruction {}", tampered, fault_index);

    let total_gas = StepMachine::new(honest_program.clone(), inbox.clone()).total_gas();
    let (challenger, honest_engine) = build_party("challenger", honest_program, &inbox, &config)?;
    let (asserter, faulty_engine) = build_party("asserter", faulty_program, &inbox, &config)?;

    // The asserter claims the whole execution in a single segment
    let segment = ChallengeSegment::new(0, total_gas);
    let claimed = asserter
        .challenge()
        .get_cuts(&faulty_engine, &segment.boundaries(1)?)?;
    let ledger = InMemoryLedger::with_bisection(Bisection::new(segment, claimed));
    let cancel = CancelToken::new();

    info!("Asserter claimed {} gas of execution, challenge opened", total_gas);

    for round in 0..MAX_ROUNDS {
        let bisection = ledger
            .current_bisection()
            .await
            .ok_or_else(|| anyhow!("No bisection on the ledger"))?;

        let mv = if round % 2 == 0 {
            challenger.respond(&cancel, &ledger, &honest_engine, &bisection).await?
        } else {
            asserter.respond(&cancel, &ledger, &faulty_engine, &bisection).await?
        };

        match mv {
            Move::Bisected { segment, .. } => {
                info!("Round {}: bisected [{}, {})", round + 1, segment.start, segment.end()?);
            }
            Move::OneStepProof { segment, tx, .. } => {
                let prover = if round % 2 == 0 { challenger.name() } else { asserter.name() };
                info!("Round {}: {} proved step at offset {}", round + 1, prover, segment.start);
                info!("  ✓ One-step proof submitted: {}", tx);
                info!(
                    "Game finished after {} submissions",
                    ledger.submission_count().await
                );
                return Ok(());
            }
        }
    }

    Err(anyhow!("Challenge did not reach a one-step proof in {} rounds", MAX_ROUNDS))
}
