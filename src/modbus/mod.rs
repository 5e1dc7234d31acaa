// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module talks to a Victron Cerbo GX gateway over Modbus/TCP. The
//! gateway publishes every connected temperature sensor as a fixed block of
//! input registers; the sensor's "VRM instance" configured in the gateway is
//! used as the Modbus unit (slave) address.
//!
//! Register reference: <https://www.victronenergy.com/live/ccgx:modbustcp_faq>
//!
//! ## Key Components
//!
//! - `TemperatureReader`: issues the single input-register read and decodes
//!   the status and temperature fields into a Fahrenheit reading.
//! - `SensorStatus`: the health states a sensor can report.
//! - `TemperatureError`: transport and decode failures, kept distinct from
//!   the "sensor unhealthy, no reading" outcome.
//! - `CerboTemperatureSimulator`: an in-process Modbus TCP server that
//!   serves the same register block for tests and demos.
//!
//! ## Register Map
//!
//! ### Temperature block (Input Registers, Read-Only)
//!
//! | Address | Description | Encoding | Scaling |
//! |---------|-------------|----------|---------|
//! | 3300 | Product ID | u16 | 1 |
//! | 3301 | Temperature scale factor | u16 | ×100 |
//! | 3302 | Temperature offset | i16 | ×100, °C |
//! | 3303 | Temperature type | u16 | 0=Battery, 1=Fridge, 2=Generic |
//! | 3304 | Temperature | i16 | ×100, °C |
//! | 3305 | Status | u16 | 0=OK, 1=Disconnected, 2=Short circuited, 3=Reverse polarity, 4=Unknown |
//!
//! Only the temperature (3304) and status (3305) registers are interpreted;
//! the first four are read as part of the block but carried along unused.
//!
//! ### Documented but not served by the gateway
//!
//! The Victron register list also names 3306 (humidity, ×10, %), 3307
//! (sensor battery voltage, ×100, V) and 3308 (atmospheric pressure, hPa),
//! but the gateway does not answer for them; reading past 3305 yields an
//! "illegal data address" exception. They are listed here so nobody wires
//! them up expecting data.

pub mod simulator;
pub mod temperature;

pub use simulator::CerboTemperatureSimulator;
pub use temperature::{
    SensorStatus, TemperatureError, TemperatureReader, TEMPERATURE_BLOCK_ADDRESS,
    TEMPERATURE_BLOCK_QUANTITY,
};
