//! Gantry Core
//!
//! Core types and abstractions for the Gantry end-to-end suite.
//!
//! This crate contains:
//! - Domain types: read-only views of the cluster and source-host resources
//! - DTOs: requests sent to the collaborators
//! - Labels: well-known labels and annotations set by the platform controllers
//! - Poll: the condition poller used to wait for eventually-consistent state

pub mod domain;
pub mod dto;
pub mod labels;
pub mod poll;
