//! bootgate binary entry point

use std::process::ExitCode;

fn main() -> ExitCode {
    bootgate::run()
}
