//! Integration tests driving the full pipeline through the public API

mod common;
mod config_test;
mod continuity_test;
mod pipeline_test;
