//! Integration tests for filecast-service
//!
//! Exercises the router against fake and real adapters, the shared
//! directory watches under paused time, browsing state over a real local
//! tree, and service wiring from a configuration.

mod common;

mod test_router;
mod test_services;
