//! dl-protocol: Shared types for docketlens.
//!
//! This crate defines the chat and portfolio types exchanged between the
//! Oracle chat backend, the session state machine, and report exports.

pub mod chat;
pub mod message;
pub mod portfolio;

pub use chat::{ChatMessage, ChatRequest, Role};
pub use message::StreamEvent;
pub use portfolio::{Bucket, ClaimRecord, ClaimStatus, PortfolioSnapshot, PortfolioTotals};
