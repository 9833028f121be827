//! Parley - a tool-calling chat backend
//!
//! Streams model responses over SSE, lets the model call a small set of
//! server-side tools (calculator, clock, session stats), and keeps session
//! records in an external key-value store. A sibling coordination service
//! (`parley-coordinator`) shares the store layer and re-derives session
//! metadata when notified about processed turns.

pub mod api;
pub mod coordinator;
pub mod llm;
pub mod orchestrator;
pub mod relay;
pub mod store;
pub mod tools;
