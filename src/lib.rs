//! Gatekeep: a ReAct agent engine with human approval of tool calls.
//!
//! A model decides which tools to call in a think/act/observe loop. Tool
//! calls can be held for approval; the loop then suspends with its state
//! persisted in the session store and resumes once the call is approved or
//! denied. A plan-and-execute mode runs a single upfront plan instead.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod testing;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
