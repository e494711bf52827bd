//! Integration tests for plugin_forge
//!
//! Each test starts its own server on an ephemeral port with the bundled
//! `template/` tree and throwaway scratch directories.
//!
//! Run with: cargo test --test integration

mod helpers;

mod form_page;
mod generate;
mod rate_limiting;
mod routing;
