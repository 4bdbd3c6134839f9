//! HTTP API handlers

pub mod answers;
pub mod health;
pub mod interviews;
pub mod proctor;
pub mod questions;
pub mod sse;
pub mod transcripts;
pub mod ws;
