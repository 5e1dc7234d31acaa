// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serve a simulated Cerbo GX temperature sensor over Modbus/TCP.
//!
//! The simulated temperature drifts slowly around 25 °C so repeated client
//! reads return changing values. Point `cerbo_client` at the listen address
//! to try the whole stack without a gateway:
//!
//! ```text
//! cargo run --bin cerbo_simulator
//! cargo run --bin cerbo_client -- --port 5502 --unit 24
//! ```

use clap::Parser;
use log::{error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};
use victron_temperature::{CerboTemperatureSimulator, SensorStatus};

/// Serve a simulated Cerbo GX temperature sensor over Modbus/TCP
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on (a real gateway uses 502)
    #[clap(long, default_value = "5502")]
    port: u16,

    /// Sensor status to report: ok, disconnected, short-circuit,
    /// reverse-polarity, unknown, or a raw register code
    #[clap(long, default_value = "ok")]
    status: String,
}

fn parse_status(raw: &str) -> anyhow::Result<u16> {
    let code: u16 = match raw {
        "ok" => SensorStatus::Ok.into(),
        "disconnected" => SensorStatus::Disconnected.into(),
        "short-circuit" => SensorStatus::ShortCircuit.into(),
        "reverse-polarity" => SensorStatus::ReversePolarity.into(),
        "unknown" => SensorStatus::Unknown.into(),
        other => other.parse()?,
    };
    Ok(code)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();
    let status_code = parse_status(&args.status)?;

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    let listener = TcpListener::bind(socket_addr).await?;
    info!(
        "Serving a simulated Cerbo temperature sensor on {}",
        socket_addr
    );

    let server = Server::new(listener);

    let simulator = CerboTemperatureSimulator::new();
    simulator.set_status_code(status_code);

    // One clone feeds the serving closure, the other drives the drift loop.
    let service_simulator = simulator.clone();
    let temperature_service = move |_socket_addr| Ok(Some(service_simulator.clone()));

    let on_connected = move |stream, socket_addr| {
        let temperature_service = temperature_service.clone();
        async move { accept_tcp_connection(stream, socket_addr, temperature_service) }
    };

    let on_process_error = |err| {
        error!("Server error: {}", err);
    };

    // Drift the simulated temperature so repeated reads change.
    let drift_handle = tokio::spawn(async move {
        let mut time_counter: f64 = 0.0;
        loop {
            let celsius = 25.0 + 5.0 * time_counter.sin();
            simulator.set_temperature_c(celsius);
            time::sleep(Duration::from_secs(1)).await;
            time_counter += 0.1;
        }
    });

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            error!("Server error: {}", e);
        }
    });

    info!("Press Ctrl+C to stop the simulator");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down simulator...");

    server_handle.abort();
    drift_handle.abort();

    Ok(())
}
