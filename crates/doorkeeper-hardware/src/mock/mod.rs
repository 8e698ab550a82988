//! Mock device implementations for testing and development.
//!
//! This module provides a simulated door controller that can be driven
//! programmatically without requiring physical hardware.

pub mod door;

pub use door::{MockDoor, MockDoorHandle, OutputEvent};
