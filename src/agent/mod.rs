//! Agent module for Tabletalk
//!
//! This module contains the answering agent boundary, its fault taxonomy, and
//! the tool-calling loop behind the production agent.

pub mod answering;
pub mod core;
pub mod fault;

pub use answering::{AgentRequest, AnsweringAgent, SqlAgent};
pub use core::Agent;
pub use fault::{AgentFault, AgentFaultKind};
