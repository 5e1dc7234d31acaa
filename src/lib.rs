// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Victron temperature library
//!
//! This library reads temperature sensors attached to a Victron Cerbo GX
//! gateway over Modbus/TCP. The gateway exposes each sensor as a block of
//! six input registers; this crate performs the single register read,
//! validates the sensor status and decodes the scaled Celsius value into
//! degrees Fahrenheit.
//!
//! ## Usage
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use tokio_modbus::prelude::*;
//! use victron_temperature::TemperatureReader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway: SocketAddr = "192.168.1.50:502".parse()?;
//!     let mut ctx = tcp::connect(gateway).await?;
//!
//!     // Unit address = the sensor's VRM instance configured in the gateway
//!     let reader = TemperatureReader::new();
//!     match reader.read_temperature_f(&mut ctx, Slave(24)).await? {
//!         Some(fahrenheit) => println!("Temperature: {:.1} F", fahrenheit),
//!         None => println!("Sensor is not reporting a healthy reading"),
//!     }
//!
//!     ctx.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod modbus;

pub use modbus::{CerboTemperatureSimulator, SensorStatus, TemperatureError, TemperatureReader};
