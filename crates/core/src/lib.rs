//! # Kyoryoku Core
//!
//! Domain types, traits, and error definitions for the Kyoryoku multi-agent
//! orchestration pipeline. This crate has **no transport dependencies**; it
//! defines the vocabulary that the provider, agent and CLI crates share.
//!
//! ## Design Philosophy
//!
//! The single external dependency of the pipeline (a text-generation call) is
//! defined as the [`Provider`] trait here. Implementations live in
//! `kyoryoku-providers`; tests substitute scripted stubs.
//!
//! Everything a stage produces is an [`AgentResult`]; everything a run threads
//! between stages is a [`PipelineContext`].

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod result;
pub mod role;
pub mod stage;

// Re-export key types at crate root for ergonomics
pub use context::PipelineContext;
pub use error::{ConfigError, Error, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use result::AgentResult;
pub use role::{RoleCatalog, RoleOverrides, RoleProfile, DEFAULT_ROLE};
pub use stage::{StageSpec, TaskVars};
