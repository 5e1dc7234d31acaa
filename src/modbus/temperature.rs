// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature readout from the Cerbo GX register map
//!
//! A temperature sensor attached to the gateway occupies six consecutive
//! input registers starting at 3300. One Modbus read fetches the whole
//! block; only two fields are interpreted here:
//!
//! - register 3304 (offset 4): the temperature as a signed 16-bit value in
//!   hundredths of a degree Celsius,
//! - register 3305 (offset 5): the sensor status.
//!
//! The decoded Celsius value is converted to Fahrenheit (`F = C * 1.8 + 32`)
//! before it is returned. A sensor reporting any defined status other than
//! `OK` yields no reading at all: the temperature register is only
//! meaningful while the sensor is healthy, so its content is never surfaced
//! for a faulted or disconnected probe.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

/// Base address of the temperature sensor input-register block.
pub const TEMPERATURE_BLOCK_ADDRESS: u16 = 3300;

/// Number of registers in the temperature block.
pub const TEMPERATURE_BLOCK_QUANTITY: u16 = 6;

/// Offset of the temperature register within the block.
const TEMPERATURE_OFFSET: usize = 4;

/// Offset of the status register within the block.
const STATUS_OFFSET: usize = 5;

/// The temperature register counts hundredths of a degree Celsius.
const CELSIUS_SCALE: f64 = 100.0;

/// Health state reported by a temperature sensor in register 3305.
///
/// The gateway defines exactly these five states. A status register value
/// outside 0-4 is a gateway firmware mismatch and is rejected as
/// [`TemperatureError::UndefinedStatus`] instead of being coerced into a
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// Sensor connected and measuring.
    Ok,
    /// No probe attached to the sensor input.
    Disconnected,
    /// Probe wiring is short circuited.
    ShortCircuit,
    /// Probe connected with reversed polarity.
    ReversePolarity,
    /// The sensor cannot classify its own state.
    Unknown,
}

impl TryFrom<u16> for SensorStatus {
    type Error = TemperatureError;

    fn try_from(value: u16) -> Result<Self, TemperatureError> {
        match value {
            0 => Ok(SensorStatus::Ok),
            1 => Ok(SensorStatus::Disconnected),
            2 => Ok(SensorStatus::ShortCircuit),
            3 => Ok(SensorStatus::ReversePolarity),
            4 => Ok(SensorStatus::Unknown),
            undefined => Err(TemperatureError::UndefinedStatus(undefined)),
        }
    }
}

impl From<SensorStatus> for u16 {
    fn from(status: SensorStatus) -> Self {
        match status {
            SensorStatus::Ok => 0,
            SensorStatus::Disconnected => 1,
            SensorStatus::ShortCircuit => 2,
            SensorStatus::ReversePolarity => 3,
            SensorStatus::Unknown => 4,
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorStatus::Ok => "OK",
            SensorStatus::Disconnected => "disconnected",
            SensorStatus::ShortCircuit => "short circuited",
            SensorStatus::ReversePolarity => "reverse polarity",
            SensorStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Failure modes of a temperature read.
///
/// A sensor reporting a defined non-`OK` status is deliberately not an
/// error: that is a normal outcome and surfaces as `Ok(None)` from the
/// read operations, with the status itself going to the log.
#[derive(Debug, Error)]
pub enum TemperatureError {
    /// The exchange with the gateway failed: connecting, timing out, or a
    /// broken response on the wire.
    #[error("modbus transport failure: {0}")]
    Transport(#[from] io::Error),

    /// The gateway answered the read with a Modbus exception.
    #[error("gateway rejected the register read: {0}")]
    Exception(ExceptionCode),

    /// The gateway answered with the wrong number of registers.
    #[error("gateway returned {got} registers, expected {expected}")]
    ShortWindow { expected: u16, got: usize },

    /// The status register holds a code outside the documented 0-4 range.
    #[error("undefined sensor status code {0}")]
    UndefinedStatus(u16),
}

/// Reads temperature sensors attached to a Victron Cerbo GX gateway.
///
/// The reader is stateless apart from the base address of the register
/// block it targets; two consecutive reads over identical responses decode
/// to identical results. One reader value can serve any number of sensors
/// and sessions.
///
/// ### Addressing
///
/// The Modbus unit (slave) address selects the sensor: it is the VRM
/// instance number the sensor was given in the gateway configuration.
/// [`Slave`] carries a `u8`, so the protocol's 0-255 unit range is the
/// type's whole domain and no out-of-range address can reach the wire.
///
/// ### Timeouts
///
/// The reader adds no deadline of its own. Callers that need one can wrap
/// the read future in `tokio::time::timeout`; dropping the future cancels
/// the exchange.
#[derive(Debug, Clone)]
pub struct TemperatureReader {
    register_base: u16,
}

impl Default for TemperatureReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureReader {
    /// Reader for the standard temperature block at register 3300.
    pub fn new() -> Self {
        Self {
            register_base: TEMPERATURE_BLOCK_ADDRESS,
        }
    }

    /// Reader for a temperature block at a non-standard base address.
    ///
    /// The Victron register list only documents base 3300 today; this
    /// constructor exists for firmware revisions that relocate the block.
    pub fn with_register_base(register_base: u16) -> Self {
        Self { register_base }
    }

    /// Read one sensor through an existing gateway session.
    ///
    /// The session is borrowed for a single request and left open; opening
    /// and closing the connection stays with the caller.
    ///
    /// Returns `Ok(Some(fahrenheit))` when the sensor reports the `OK`
    /// status, `Ok(None)` for any other defined status, and an error when
    /// the gateway could not be read or answered something outside the
    /// register map contract.
    pub async fn read_temperature_f(
        &self,
        ctx: &mut Context,
        unit: Slave,
    ) -> Result<Option<f64>, TemperatureError> {
        ctx.set_slave(unit);
        debug!(
            "Requesting {} input registers at {} from VRM instance {}",
            TEMPERATURE_BLOCK_QUANTITY, self.register_base, unit.0
        );
        let response = ctx
            .read_input_registers(self.register_base, TEMPERATURE_BLOCK_QUANTITY)
            .await
            .map_err(io::Error::other)?;
        let words = response.map_err(TemperatureError::Exception)?;
        decode_temperature_f(&words, unit)
    }

    /// Connect to a gateway, read one sensor, disconnect.
    ///
    /// Convenience for callers without a long-lived session. The connection
    /// is owned here for the duration of exactly one read; a disconnect
    /// failure after a completed read is logged and discarded, since the
    /// reading is already in hand.
    pub async fn read_from_gateway(
        &self,
        gateway: SocketAddr,
        unit: Slave,
    ) -> Result<Option<f64>, TemperatureError> {
        let mut ctx = tcp::connect_slave(gateway, unit)
            .await
            .map_err(io::Error::other)?;
        let reading = self.read_temperature_f(&mut ctx, unit).await;
        if let Err(err) = ctx.disconnect().await {
            warn!("Error while closing the session to {}: {}", gateway, err);
        }
        reading
    }
}

/// Decode one raw register window into a Fahrenheit reading.
///
/// Pure: no I/O, no state, the same window always decodes to the same
/// result. The window must span the whole block even though only the
/// temperature and status registers are interpreted.
fn decode_temperature_f(words: &[u16], unit: Slave) -> Result<Option<f64>, TemperatureError> {
    if words.len() != TEMPERATURE_BLOCK_QUANTITY as usize {
        return Err(TemperatureError::ShortWindow {
            expected: TEMPERATURE_BLOCK_QUANTITY,
            got: words.len(),
        });
    }

    let status = SensorStatus::try_from(words[STATUS_OFFSET])?;
    if status != SensorStatus::Ok {
        if status == SensorStatus::Disconnected {
            warn!(
                "No reading from VRM instance {}: sensor reports '{}'",
                unit.0, status
            );
        } else {
            error!(
                "Failed to read Cerbo temperature for VRM instance {}. Device status is not 'OK': {}.",
                unit.0, status
            );
        }
        return Ok(None);
    }

    let celsius = words[TEMPERATURE_OFFSET] as i16 as f64 / CELSIUS_SCALE;
    let fahrenheit = celsius * 1.8 + 32.0;
    info!(
        "Received temperature C={:.1} F={:.1} for VRM instance {}",
        celsius, fahrenheit, unit.0
    );
    Ok(Some(fahrenheit))
}
