//! `vtel-hal` – Vehicle client abstraction
//!
//! The rest of the workspace never talks to a vendor telemetry SDK directly.
//! It talks to the [`VehicleClient`] trait, so the SDK binding can be swapped
//! for a simulation without touching validation or fan-out logic.
//!
//! # Modules
//!
//! - [`client`] – the [`VehicleClient`] trait and the [`SignalHandler`]
//!   callback type a connected client feeds raw samples into.
//! - [`sim`] – [`SimVehicleClient`], an in-process client for tests and
//!   replays that needs no vehicle.

pub mod client;
pub mod sim;

pub use client::{SignalHandler, VehicleClient};
pub use sim::{SimFaults, SimVehicleClient, SimVehicleClientBuilder};
