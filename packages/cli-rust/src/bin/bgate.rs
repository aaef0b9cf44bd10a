//! bgate - short alias for bootgate

use std::process::ExitCode;

fn main() -> ExitCode {
    bootgate::run()
}
