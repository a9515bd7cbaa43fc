//! HTTP surface and wiring for the docbot pipeline.
//!
//! `bootstrap` resolves configured capability names into a ready pipeline,
//! `webhook` owns the `/chat` routes, and `example` ships a minimal
//! integration useful for local runs and smoke tests.

pub mod bootstrap;
pub mod example;
pub mod webhook;
