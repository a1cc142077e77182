//! kwicmark-an: annotation engine for Kwicmark
//!
//! Walks per-user navigation cursors over a project's snippets, records
//! binary decisions in the annotation ledger, computes inter-annotator
//! agreement (Cohen's Kappa) and intra-annotator consistency, and
//! drives the superannotator's disagreement review queue.

pub mod adjudication;
pub mod agreement;
pub mod consistency;
pub mod cursor;
pub mod db;
pub mod session;
pub mod transfer;
