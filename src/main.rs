//! pciheader - Print the configuration header of a PCI(e) device
//!
//! Looks up one function by bus, device and function number and prints its
//! standard configuration header (type 0 endpoint or type 1 bridge layout)
//! as a two-pane table of register names and decoded values.
//!
//! # Architecture
//!
//! - `pciheader-core` holds the header layouts, the decoder and the table
//!   renderer, all written against the `BusAccess` trait.
//! - Backends (`pciheader-sysfs`, `pciheader-dummy`) implement `BusAccess`
//!   and are selected with `--access`.
//!
//! The bus handle is owned by a single call path and released when it goes
//! out of scope, whichever way the command ends.

mod backends;
mod cli;
mod commands;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use cli::{ArgError, Cli, Target};
use pciheader_core::{BusAccess, Error};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "pciheader".to_string());
    let mut stdout = std::io::stdout().lock();
    ExitCode::from(execute(&cli, &program, backends::open_backend, &mut stdout))
}

/// Log filter for the given number of `-v` flags
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(verbose)))
        .init();
}

/// Run the command described by `cli`, writing the result to `out`
///
/// Returns the process exit code. The bus is only opened once the
/// arguments are known to be valid.
fn execute<F>(cli: &Cli, program: &str, open: F, out: &mut dyn Write) -> u8
where
    F: FnOnce(&Cli) -> Result<Box<dyn BusAccess>, Box<dyn std::error::Error>>,
{
    let target = match cli.target() {
        Ok(target) => target,
        Err(ArgError::Count(e)) => {
            log::debug!("{}", e);
            return emit(out, &cli::usage(program), 1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut bus = match open(cli) {
        Ok(bus) => bus,
        Err(e) => {
            eprintln!("Failed to open PCI bus: {}", e);
            return 1;
        }
    };

    let result = match target {
        Target::Device(id) => commands::show_header(bus.as_mut(), id),
        Target::List => commands::list_devices(bus.as_mut()),
    };
    drop(bus);

    match result {
        Ok(text) => emit(out, &text, 0),
        Err(e @ Error::DeviceNotFound(_)) => emit(out, &format!("{}\n", e), 1),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(source) = std::error::Error::source(&e) {
                log::debug!("Caused by: {}", source);
            }
            1
        }
    }
}

/// Write `text` to `out` and pass `code` through, or fail with 1
fn emit(out: &mut dyn Write, text: &str, code: u8) -> u8 {
    match out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        Ok(()) => code,
        Err(e) => {
            eprintln!("Failed to write output: {}", e);
            1
        }
    }
}
