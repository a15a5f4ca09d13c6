//! Session-scoring domain logic, kept free of HTTP concerns: the append-only
//! ledger, lineup planning, score derivation, and undo.

pub mod ledger;
pub mod lineup;
pub mod score;
pub mod undo;
