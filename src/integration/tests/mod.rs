//! Unit tests for the integration bounded context.

mod domain_tests;
mod fixtures;
mod render_tests;
