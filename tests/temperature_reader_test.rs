// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the victron-temperature project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the TemperatureReader against an in-process gateway simulator
//!
//! Each test starts a CerboTemperatureSimulator on an ephemeral port,
//! connects a Modbus client to it and drives the register content through
//! the simulator handle. The three outcomes the reader distinguishes are
//! all covered: a Fahrenheit value, an absent reading for a sensor in a
//! defined non-OK state, and hard errors for transport and decode
//! failures.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use victron_temperature::{
    CerboTemperatureSimulator, SensorStatus, TemperatureError, TemperatureReader,
};

/// Start a simulated gateway on an ephemeral port.
///
/// Returns the listen address, a handle for driving the scenario and the
/// server task. The handle shares register state with the clones serving
/// the connections, so changes made through it are visible to clients
/// immediately.
async fn start_simulator() -> Result<
    (
        SocketAddr,
        CerboTemperatureSimulator,
        tokio::task::JoinHandle<()>,
    ),
    Box<dyn std::error::Error>,
> {
    // Use port 0 to let the OS assign an available port
    let socket_addr = SocketAddr::from_str("127.0.0.1:0").unwrap();
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;
    println!("Simulated gateway started on: {}", socket_addr);

    let server = Server::new(listener);
    let simulator = CerboTemperatureSimulator::new();

    let service_simulator = simulator.clone();
    let temperature_service = move |_socket_addr| Ok(Some(service_simulator.clone()));

    let on_connected = move |stream, socket_addr| {
        let temperature_service = temperature_service.clone();
        async move { accept_tcp_connection(stream, socket_addr, temperature_service) }
    };

    let on_process_error = |err| {
        eprintln!("Server error: {}", err);
    };

    // Start the server in a background task
    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(100)).await;

    Ok((socket_addr, simulator, handle))
}

#[tokio::test]
async fn test_reads_healthy_temperature() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _simulator, _server_handle) = start_simulator().await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    let reader = TemperatureReader::new();

    // The simulator starts out healthy at 25.00 C
    let reading = reader.read_temperature_f(&mut ctx, Slave(24)).await?;
    let fahrenheit = reading.expect("healthy sensor must yield a reading");
    assert!((fahrenheit - 77.0).abs() < 1e-9);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_reads_negative_temperature() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, _server_handle) = start_simulator().await?;
    simulator.set_temperature_c(-5.0);

    let mut ctx = tcp::connect(socket_addr).await?;
    let reading = TemperatureReader::new()
        .read_temperature_f(&mut ctx, Slave(24))
        .await?;
    assert!((reading.unwrap() - 23.0).abs() < 1e-9);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_unhealthy_sensor_yields_no_reading() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, _server_handle) = start_simulator().await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    let reader = TemperatureReader::new();

    // The temperature register keeps its 25.00 C content the whole time;
    // it must not leak out for any non-OK status.
    for status in [
        SensorStatus::Disconnected,
        SensorStatus::ShortCircuit,
        SensorStatus::ReversePolarity,
        SensorStatus::Unknown,
    ] {
        simulator.set_status(status);
        let reading = reader.read_temperature_f(&mut ctx, Slave(24)).await?;
        assert_eq!(reading, None, "status '{}' must not yield a reading", status);
    }

    // Back to OK, the stored temperature becomes visible again
    simulator.set_status(SensorStatus::Ok);
    let reading = reader.read_temperature_f(&mut ctx, Slave(24)).await?;
    assert!((reading.unwrap() - 77.0).abs() < 1e-9);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_uninterpreted_registers_do_not_affect_reading(
) -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, _server_handle) = start_simulator().await?;

    // Product ID, scale factor, offset and type are read as part of the
    // block but never interpreted; garbage in them must change nothing.
    simulator.set_register(3300, 0xFFFF);
    simulator.set_register(3301, 0);
    simulator.set_register(3302, 500);
    simulator.set_register(3303, 999);

    let mut ctx = tcp::connect(socket_addr).await?;
    let reading = TemperatureReader::new()
        .read_temperature_f(&mut ctx, Slave(24))
        .await?;
    assert!((reading.unwrap() - 77.0).abs() < 1e-9);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_undefined_status_fails_decoding() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, simulator, _server_handle) = start_simulator().await?;
    simulator.set_status_code(9);

    let mut ctx = tcp::connect(socket_addr).await?;
    match TemperatureReader::new()
        .read_temperature_f(&mut ctx, Slave(24))
        .await
    {
        Err(TemperatureError::UndefinedStatus(code)) => assert_eq!(code, 9),
        other => panic!("expected UndefinedStatus, got {:?}", other),
    }

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_unserved_register_base_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _simulator, _server_handle) = start_simulator().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    // 3306 is documented in the Victron register list but not served by
    // the gateway; the simulator refuses it the same way.
    let reader = TemperatureReader::with_register_base(3306);
    match reader.read_temperature_f(&mut ctx, Slave(24)).await {
        Err(TemperatureError::Exception(code)) => {
            assert_eq!(code.to_string(), "Illegal data address");
        }
        other => panic!("expected a gateway exception, got {:?}", other),
    }

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_dead_gateway_is_a_transport_error() -> Result<(), Box<dyn std::error::Error>> {
    // Bind and immediately drop a listener to get an address nobody serves.
    let listener = TcpListener::bind(SocketAddr::from_str("127.0.0.1:0").unwrap()).await?;
    let dead_addr = listener.local_addr()?;
    drop(listener);

    // A gateway that cannot be reached is a hard failure, never "no
    // reading".
    match TemperatureReader::new()
        .read_from_gateway(dead_addr, Slave(24))
        .await
    {
        Err(TemperatureError::Transport(_)) => {}
        other => panic!("expected Transport, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_read_from_gateway_owns_its_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _simulator, _server_handle) = start_simulator().await?;

    let reading = TemperatureReader::new()
        .read_from_gateway(socket_addr, Slave(24))
        .await?;
    assert!((reading.unwrap() - 77.0).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_consecutive_reads_are_identical() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _simulator, _server_handle) = start_simulator().await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    let reader = TemperatureReader::new();

    let first = reader.read_temperature_f(&mut ctx, Slave(24)).await?;
    let second = reader.read_temperature_f(&mut ctx, Slave(24)).await?;
    assert_eq!(first, second);
    assert!((first.unwrap() - 77.0).abs() < 1e-9);

    ctx.disconnect().await?;
    Ok(())
}
