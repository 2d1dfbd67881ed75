//! hl7-profile - Corpus profiler for HL7 v2 messages
//!
//! This library decodes HL7 v2 message files, aggregates bounded per-field
//! value statistics, infers value types, profiles segment ordering per
//! message category, and assembles everything into one combined JSON
//! profile document.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod field_value;
pub mod infer;
pub mod ingest;
pub mod report;
pub mod sequence;
pub mod vocabulary;
