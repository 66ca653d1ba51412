//! Built-in tool implementations for relay.
//!
//! Tools give the agent the ability to look at the world around its
//! working directory. Every tool here implements `relay_core::Tool` and is
//! dispatched through a `relay_core::ToolRegistry`.

pub mod file_read;
pub mod paths;
pub mod text;

pub use file_read::ReadFileTool;
