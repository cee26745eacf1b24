//! Shared fixtures for crimson-install integration tests.

pub mod fakes;
