//! Application core.
//!
//! Coordination state shared by the activities, the command set and the
//! service that applies it. All interaction with hardware and the broker
//! happens through the **port traits** in [`ports`], so this layer runs
//! unchanged against the simulated adapters on the host.

pub mod channels;
pub mod commands;
pub mod coordinator;
pub mod ports;
pub mod service;
