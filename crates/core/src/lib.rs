//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the Stepwise agent loop.
//! This crate has **no framework dependencies** — it defines the domain model
//! (plans, per-conversation agent state, tools, providers, events) that every
//! other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] — the reasoning engine (opaque: messages + tools in,
//!   text or tool calls out)
//! - [`Tool`] — a named action with a JSON argument schema
//! - [`StateStore`] — durable per-conversation state with atomic patches
//!
//! Implementations live in their respective crates, which keeps the
//! orchestration logic testable against in-memory stand-ins.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod state;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition};
pub use state::{AgentPlan, AgentState, AgentStatus, CompletedStep, PlanStep, StepStatus};
pub use store::{StatePatch, StateStore};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
