//! DarTwin Core Types and Definitions
//!
//! This crate provides the foundational types shared by every stage of the
//! DarTwin pipeline. It includes:
//!
//! - **Model**: The parser's output in the language's own vocabulary ([`model`] module)
//! - **Graph**: Typed nodes and edges ready for rendering ([`graph`] module)
//! - **Identifiers**: Deterministic structural node ids ([`identifier::NodeId`])
//! - **Geometry**: Basic geometric types ([`geometry`] module)
//! - **Interchange**: JSON validation and (de)serialization ([`interchange`] module)

pub mod geometry;
pub mod graph;
pub mod identifier;
pub mod interchange;
pub mod model;
