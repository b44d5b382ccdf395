//! # Typsio Test Suite
//!
//! Unified test crate exercising the client and server crates together over
//! an in-memory link.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs     # end-to-end call, error, push and disconnect scenarios
//!     └── races.rs     # settlement races, reconnects, timeout fidelity
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p typsio-tests
//! cargo test -p typsio-tests integration::races::
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
