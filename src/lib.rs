//! The deterministic core of a Mir-BFT-derived total order broadcast
//! library.
//!
//! This crate is a pure state machine: it performs no I/O, no hashing,
//! and no network call of its own. A host drives it through
//! [`core::StateMachineCore`]'s four entry points — `propose`, `step`,
//! `tick`, `add_results` — and inspects [`core::StateMachineCore::ready`]
//! to drain the [`actions::Actions`] bundle of side effects (broadcasts,
//! unicasts, hash requests, persistence writes, commits) the host must
//! carry out. A commit flagged `checkpoint: true` is itself the ask for
//! a checkpoint value, answered back through
//! [`actions::ActionResults::checkpoints`].

pub mod actions;
pub mod checkpoint;
pub mod client;
pub mod collections;
pub mod config;
pub mod core;
pub mod digest;
pub mod error;
pub mod identifiers;
pub mod log;
pub mod message;
pub mod ordering;
pub mod proposer;

pub use crate::core::StateMachineCore;
