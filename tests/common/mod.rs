//! Integration test common infrastructure.
//!
//! Provides utilities for binding in-process test servers and driving
//! them with a line-oriented POP3 client.

// Each test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{TestServer, PASSWORD};
