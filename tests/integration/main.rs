//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host (x86_64) with no
//! real hardware required.

#![cfg(not(target_os = "espidf"))]

use critical_section as _;

mod activity_tests;
mod command_tests;
mod coordination_tests;
mod decoder_tests;
mod mock_hw;
