//! Test doubles for the relay's collaborators.

mod mocks;

pub use mocks::{MockFetcher, MockPredictionClient, MockResultStore};
