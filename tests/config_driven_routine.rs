// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Building routines from a parsed configuration file, and the log lines
//! a routine emits while doing so.

use eventcalls::config::{parse_config, validate_config};
use eventcalls::observability::{build_filter_string, CrateDebugFlags};
use eventcalls::prelude::*;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

const CONFIG: &str = r#"
[routine]
thread_name = "telemetry-reader"
detailed_errors = true

[datagram]
host = "127.0.0.1"
port = 0
buffer_size = 512
poll_interval_ms = 20

[channel]
name = "telemetry"

[logging]
level = "warn"
"#;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[test]
fn test_routine_from_parsed_config() {
    let config = parse_config(CONFIG).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.routine.thread_name.as_deref(), Some("telemetry-reader"));
    assert!(config.routine.stop_on_drop);
    assert_eq!(config.datagram.buffer_size, 512);

    let endpoint = DatagramEndpoint::new(config.datagram.clone()).unwrap();
    let routine = Routine::with_config(endpoint, CallbackHandler::new(), config.routine.clone());
    routine.start().unwrap();

    assert!(routine.is_running());
    assert!(routine.config().detailed_errors);
    assert_eq!(routine.endpoint().config().poll_interval_ms, 20);

    routine.stop();
    assert_eq!(routine.state(), RoutineState::Stopped);
}

#[test]
fn test_channel_from_parsed_config() {
    let config = parse_config(CONFIG).unwrap();
    let (endpoint, feeder) = channel_pair(config.channel.clone());
    assert_eq!(endpoint.describe(), "channel:telemetry");

    let routine = Routine::spawn(endpoint, CallbackHandler::new()).unwrap();
    feeder.end().unwrap();
    routine.stop();
    assert_eq!(routine.state(), RoutineState::Stopped);
}

#[test]
fn test_filter_from_config_and_debug_flags() {
    let config = parse_config(CONFIG).unwrap();
    let flags = CrateDebugFlags::from_args(vec!["--debug-eventcalls-core".to_string()]);

    let filter = build_filter_string(&config.logging, &flags).unwrap();
    assert_eq!(filter, "eventcalls_core=debug,warn");
}

#[test]
fn test_routine_lifecycle_is_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let (endpoint, _feeder) = channel_pair(ChannelConfig::new("logged"));
        let failing = Routine::new(endpoint, CallbackHandler::new());
        failing.endpoint().close().unwrap();
        failing.start().unwrap();
        assert_eq!(failing.state(), RoutineState::Stopped);
    });

    let output = logs.contents();
    assert!(output.contains("[ROUTINE] Failed to open channel:logged"));
    assert!(output.contains("[ROUTINE] Finalizing channel:logged"));
}
