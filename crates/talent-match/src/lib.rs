//! Core library for the talent-matching service.
//!
//! The pipeline turns heterogeneous per-employee assessment records into one
//! comparable match rate per candidate, relative to the median profile of a
//! caller-chosen benchmark cohort. Everything here is synchronous and
//! request-scoped: one invocation fetches fresh copies of every table,
//! computes, and returns a fully ranked report or a single tagged failure.

pub mod config;
pub mod error;
pub mod matching;
pub mod profile;
pub mod source;
pub mod telemetry;
