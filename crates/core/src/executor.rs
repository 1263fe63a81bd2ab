//! Reference step machine
//!
//! A small deterministic machine with a gas-metered instruction set. It reads
//! inbox messages, sends messages, emits logs and writes a side buffer that
//! is committed to separately from the core state.

use serde::{Deserialize, Serialize};
use crate::engine::{Assertion, Machine, MachineSnapshot};
use crate::error::ReplayError;
use crate::types::{keccak256, u256_word, Hash};

/// Upper bound on side buffer slots
pub const MAX_BUFFER_SLOTS: usize = 1024;

/// Machine instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// register += value
    Add(u64),
    /// register *= value
    Mul(u64),
    /// Mix the next inbox message into the register
    ReadInbox,
    /// Send the register as an outgoing message
    Send,
    /// Emit the register as a log entry
    Log,
    /// Store the register in a buffer slot
    BufferWrite(u16),
    /// Stop execution
    Halt,
}

impl Instruction {
    /// Gas charged for executing this instruction
    pub fn gas_cost(&self) -> u64 {
        match self {
            Self::Add(_) => 1,
            Self::Mul(_) => 3,
            Self::ReadInbox => 10,
            Self::Send => 5,
            Self::Log => 2,
            Self::BufferWrite(_) => 4,
            Self::Halt => 0,
        }
    }
}

/// State serialized into the primary one-step proof
#[derive(Serialize)]
struct StepProof<'a> {
    pc: u64,
    register: u64,
    inbox_position: u64,
    instruction: &'a Instruction,
    buffer_hash: Hash,
    /// Hash of the message the step consumes, if it reads the inbox
    inbox_message: Option<Hash>,
}

/// Deterministic reference machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMachine {
    program: Vec<Instruction>,
    inbox: Vec<Vec<u8>>,
    pc: u64,
    register: u64,
    inbox_position: u64,
    buffer: Vec<u64>,
    halted: bool,
}

impl StepMachine {
    /// Create a machine at the start of `program`, reading from `inbox`
    pub fn new(program: Vec<Instruction>, inbox: Vec<Vec<u8>>) -> Self {
        Self {
            program,
            inbox,
            pc: 0,
            register: 0,
            inbox_position: 0,
            buffer: Vec::new(),
            halted: false,
        }
    }

    /// Total gas of running the whole program
    pub fn total_gas(&self) -> u64 {
        self.program.iter().map(Instruction::gas_cost).sum()
    }

    /// Current register value
    pub fn register(&self) -> u64 {
        self.register
    }

    /// Index of the next instruction
    pub fn pc(&self) -> u64 {
        self.pc
    }

    fn buffer_hash(&self) -> Hash {
        let words: Vec<Hash> = self.buffer.iter().map(|slot| u256_word(*slot)).collect();
        let parts: Vec<&[u8]> = words.iter().map(|word| word.as_slice()).collect();
        keccak256(&parts)
    }

    fn next_instruction(&self) -> Option<Instruction> {
        usize::try_from(self.pc)
            .ok()
            .and_then(|pc| self.program.get(pc))
            .copied()
    }

    /// Execute one instruction, recording its effects into `assertion`
    fn step(&mut self, instruction: Instruction, assertion: &mut Assertion) {
        match instruction {
            Instruction::Add(value) => self.register = self.register.wrapping_add(value),
            Instruction::Mul(value) => self.register = self.register.wrapping_mul(value),
            Instruction::ReadInbox => {
                let Some(message) = self.inbox.get(self.inbox_position as usize) else {
                    // Blocked on an empty inbox
                    self.halted = true;
                    return;
                };
                let digest = keccak256(&[message]);
                let mut word = [0u8; 8];
                word.copy_from_slice(&digest[..8]);
                self.register ^= u64::from_be_bytes(word);
                self.inbox_position += 1;
                assertion.inbox_messages_read += 1;
            }
            Instruction::Send => assertion.sends.push(self.register.to_be_bytes().to_vec()),
            Instruction::Log => assertion.logs.push(self.register.to_be_bytes().to_vec()),
            Instruction::BufferWrite(slot) => {
                let slot = usize::from(slot).min(MAX_BUFFER_SLOTS - 1);
                if self.buffer.len() <= slot {
                    self.buffer.resize(slot + 1, 0);
                }
                self.buffer[slot] = self.register;
            }
            Instruction::Halt => {
                self.halted = true;
                return;
            }
        }
        self.pc += 1;
    }
}

impl MachineSnapshot for StepMachine {
    fn marshal_for_proof(&self) -> Result<Vec<u8>, ReplayError> {
        let instruction = self
            .next_instruction()
            .filter(|_| !self.halted)
            .ok_or_else(|| ReplayError::Marshal {
                what: "machine proof",
                reason: format!("machine halted at pc {}, no step to prove", self.pc),
            })?;

        let inbox_message = match instruction {
            Instruction::ReadInbox => self
                .inbox
                .get(self.inbox_position as usize)
                .map(|message| keccak256(&[message])),
            _ => None,
        };

        let proof = StepProof {
            pc: self.pc,
            register: self.register,
            inbox_position: self.inbox_position,
            instruction: &instruction,
            buffer_hash: self.buffer_hash(),
            inbox_message,
        };
        bincode::serialize(&proof).map_err(|e| ReplayError::Marshal {
            what: "machine proof",
            reason: e.to_string(),
        })
    }

    fn marshal_buffer_proof(&self) -> Result<Vec<u8>, ReplayError> {
        bincode::serialize(&self.buffer).map_err(|e| ReplayError::Marshal {
            what: "buffer proof",
            reason: e.to_string(),
        })
    }
}

impl Machine for StepMachine {
    /// The program is not part of the hash: it is fixed by the challenge,
    /// and only the state it drives is committed to.
    fn hash(&self) -> Hash {
        keccak256(&[
            &u256_word(self.pc),
            &u256_word(self.register),
            &u256_word(self.inbox_position),
            &self.buffer_hash(),
            &[u8::from(self.halted)],
        ])
    }

    fn execute(&mut self, max_gas: u64, go_over_gas: bool) -> Assertion {
        let mut assertion = Assertion::default();

        while !self.halted && assertion.gas_used < max_gas {
            let Some(instruction) = self.next_instruction() else {
                self.halted = true;
                break;
            };

            let cost = instruction.gas_cost();
            if !go_over_gas && assertion.gas_used + cost > max_gas {
                break;
            }

            self.step(instruction, &mut assertion);
            if !self.halted {
                assertion.gas_used += cost;
            }
        }

        assertion
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}
