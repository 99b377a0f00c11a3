//! Outer adapters: CSV input and output for the batch binary.

pub mod csv;
