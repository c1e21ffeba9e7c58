//! Engine modules: pure planning between operator input and execution.
//!
//! The engine layer turns what the operator decided (boot mode, partition
//! roles) into ordered, validated operation plans. It performs no I/O.

pub mod storage;
