// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cerbo GX temperature block simulator
//!
//! For avoiding confusion with the Modbus master/slave terminology, this
//! module uses the terms "server" and "client": the simulator is the server
//! that provides register data, exactly as the gateway would, and whatever
//! reads from it is the client.
//!
//! The simulator serves the six-register temperature block at 3300 and
//! nothing else. Like the real gateway it refuses reads outside the block
//! with `IllegalDataAddress` and refuses every non-read function with
//! `IllegalFunction`; the temperature block is read-only on the device, so
//! there is no write path at all.

use std::{
    collections::HashMap,
    future,
    sync::{Arc, Mutex},
};

use log::{debug, error};
use tokio_modbus::prelude::*;

use super::temperature::{SensorStatus, TEMPERATURE_BLOCK_ADDRESS};

/// In-process stand-in for a temperature sensor behind a Cerbo GX.
///
/// Register state lives behind `Arc<Mutex<...>>`, so the simulator is
/// `Clone`: one handle goes into the serving closure (one clone per client
/// connection) while another stays with the test or demo driving the
/// scenario through the setter methods. All clones share the same
/// registers, and updates are visible to connected clients on their next
/// read.
#[derive(Debug, Clone)]
pub struct CerboTemperatureSimulator {
    /// The simulated input registers, keyed by absolute register address.
    input_registers: Arc<Mutex<HashMap<u16, u16>>>,
}

impl tokio_modbus::server::Service for CerboTemperatureSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadInputRegisters(addr, cnt) => {
                register_read(&self.input_registers.lock().unwrap(), addr, cnt)
                    .map(Response::ReadInputRegisters)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - the temperature block is read-only: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        future::ready(res)
    }
}

impl Default for CerboTemperatureSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CerboTemperatureSimulator {
    /// Simulator with a healthy generic sensor reading 25.00 °C.
    ///
    /// Registers 3306-3308 (humidity, battery voltage, pressure) stay
    /// unseeded on purpose: the gateway documents but does not serve them,
    /// and reads past the block must fail here the way they fail there.
    pub fn new() -> Self {
        let mut input_registers = HashMap::new();
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS, 0); // Product ID
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS + 1, 100); // Scale factor x100
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS + 2, 0); // Offset, 0.00 C
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS + 3, 2); // Type: generic
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS + 4, 2500); // 25.00 C
        input_registers.insert(TEMPERATURE_BLOCK_ADDRESS + 5, 0); // Status: OK

        Self {
            input_registers: Arc::new(Mutex::new(input_registers)),
        }
    }

    /// Point the simulated probe at a new Celsius temperature.
    ///
    /// Values outside the register's -327.68..=327.67 range are clamped to
    /// the nearest representable extreme.
    pub fn set_temperature_c(&self, celsius: f64) {
        let raw = (celsius * 100.0)
            .round()
            .clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        self.input_registers
            .lock()
            .unwrap()
            .insert(TEMPERATURE_BLOCK_ADDRESS + 4, raw as u16);
        debug!("Simulated temperature set to {:.2} C (raw {})", celsius, raw);
    }

    /// Report a defined sensor status.
    pub fn set_status(&self, status: SensorStatus) {
        self.set_status_code(status.into());
    }

    /// Report a raw status register value, including codes outside the
    /// documented range, for driving decode-failure scenarios.
    pub fn set_status_code(&self, code: u16) {
        self.input_registers
            .lock()
            .unwrap()
            .insert(TEMPERATURE_BLOCK_ADDRESS + 5, code);
        debug!("Simulated status register set to {}", code);
    }

    /// Overwrite a single register anywhere in the simulated map.
    pub fn set_register(&self, addr: u16, value: u16) {
        self.input_registers.lock().unwrap().insert(addr, value);
    }
}

/// Read a register span from the simulated map.
///
/// An address without a seeded value refuses the whole read, which is how
/// the gateway answers for addresses it does not serve.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = vec![0; cnt.into()];
    for i in 0..cnt {
        let reg_addr = addr + i;
        if let Some(r) = registers.get(&reg_addr) {
            response_values[i as usize] = *r;
        } else {
            error!(
                "Exception::IllegalDataAddress - register {} is not served",
                reg_addr
            );
            return Err(ExceptionCode::IllegalDataAddress);
        }
    }

    Ok(response_values)
}
