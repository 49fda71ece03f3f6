//! Wire format types for the runner protocol
//!
//! Pure serde structs matching the runner's JSON request, response and
//! stream chunk shapes. They are only used at the boundary.

pub mod runner;
