//! Tool system.
//!
//! Tools are the agent's only way to act on the outside world. The engine
//! needs nothing from a tool beyond its name, description, parameter schema
//! and an async `execute`.

pub mod builtin;

mod registry;
mod tool;

pub use registry::ToolRegistry;
pub use tool::{
    Tool, ToolError, ToolOutput, ToolSchema, is_ok_result, optional_bool, optional_str,
    require_param, require_str, validate_tool_schema,
};
