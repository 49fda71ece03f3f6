//! Conversion between canonical types and the runner wire format
//!
//! Requests flow through [`messages`] and [`tools`]; single-shot responses
//! come back through [`response`], streamed ones through [`stream`].

pub mod messages;
pub mod response;
pub mod stream;
pub mod tools;
pub mod usage;
