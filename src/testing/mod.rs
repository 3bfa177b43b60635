//! Testing utilities for applications that mount the Vortex routes
//!
//! Alba-style request scenarios run against an Axum [`Router`](axum::Router)
//! in-process. [`Scenario::signed_body`] signs a webhook payload the way Vortex
//! does, and repeated calls to [`Scenario::signature`] send the header more than
//! once.

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, delete, get, post, webhook};
