// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use log::info;
use serde::Serialize;
use std::net::SocketAddr;
use tokio_modbus::prelude::*;
use victron_temperature::TemperatureReader;

/// One-shot temperature readout from a sensor behind a Victron Cerbo GX
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Gateway address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Gateway Modbus port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Unit address of the sensor, i.e. its VRM instance in the gateway
    #[clap(long)]
    unit: u8,

    /// Base address of the temperature register block
    #[clap(long, default_value = "3300")]
    register_base: u16,

    /// Print the result as JSON instead of text
    #[clap(long)]
    json: bool,
}

/// JSON shape of one readout.
#[derive(Debug, Serialize)]
struct Reading {
    unit: u8,
    fahrenheit: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    let gateway: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    // stdout carries only the reading; progress goes to the log
    info!("Reading VRM instance {} via {}", args.unit, gateway);

    let reader = TemperatureReader::with_register_base(args.register_base);
    let reading = reader.read_from_gateway(gateway, Slave(args.unit)).await?;

    if args.json {
        let reading = Reading {
            unit: args.unit,
            fahrenheit: reading,
        };
        println!("{}", serde_json::to_string(&reading)?);
    } else {
        match reading {
            Some(fahrenheit) => println!("Temperature: {:.1} F", fahrenheit),
            None => println!("No reading: the sensor does not report a healthy status"),
        }
    }

    Ok(())
}
