// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing sink initialization: rolling file appender, `info`-default
//! env filter, plain or JSON formatting per config.

use breeze_core::LogFormat;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Guard returned from [`init`]; must be held for the process lifetime or
/// the non-blocking writer drops buffered lines on drop.
pub struct LoggingGuard(#[allow(dead_code)] tracing_appender::non_blocking::WorkerGuard);

pub fn init(log_path: &Path, level: &str, format: LogFormat) -> std::io::Result<LoggingGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("breezed.log"));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_writer(non_blocking)).init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().with_writer(non_blocking)).init();
        }
    }

    Ok(LoggingGuard(guard))
}
