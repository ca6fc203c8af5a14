//! Relay orchestration: per-event controller and worker pool.

mod controller;
mod worker;


pub use controller::RelayController;
pub use worker::RelayWorkerPool;
