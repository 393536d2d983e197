//! docarchive binary
//!
//! Argument parsing, logging setup and dispatch all live in `cli`.
//! Any error is printed as a single coded line on stderr and the
//! process exits with status 1.

use docarchive::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
