/// Database model definitions.
pub mod models;
/// Read-only roster collaborator.
pub mod roster;
/// Session, ledger, and lineup storage operations.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
