//! Reasoning-action orchestration.
//!
//! - [`decision`]: model output -> [`Decision`]
//! - [`react`]: the bounded think/act/observe loop
//! - [`session`], [`store`]: sessions and the approval state machine
//! - [`chat`]: turns over persisted sessions, with suspend/resume
//! - [`plan`]: single-shot plan-and-execute

pub mod chat;
pub mod decision;
pub mod plan;
pub mod prompt;
pub mod react;
pub mod scratchpad;
pub mod session;
pub mod store;

pub use chat::ChatService;
pub use decision::{Decision, parse_decision};
pub use plan::{PlanExecutor, PlanReport, PlanStep, StepOutcome, parse_plan};
pub use react::{GatedCall, LoopOutcome, LoopState, ReactLoop, Termination};
pub use scratchpad::Scratchpad;
pub use session::{
    ApprovalDecision, ApprovalStatus, ChatMessage, ChatReply, ChatSession, PendingToolCall,
    ReplyStatus, Role, SessionState, ToolApproval, ToolCallRequest, WorkflowKind,
};
pub use store::{InMemorySessionStore, Resolution, SessionStore};
