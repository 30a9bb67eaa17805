//! obsmeta CLI entry point
//!
//! Parses arguments and dispatches through [`cli::run`]. Errors are
//! reported on stdout as a JSON error object and on stderr as text, and
//! the process exits non-zero.

use obsmeta::cli;

fn main() {
    if let Err(e) = cli::run() {
        let _ = cli::write_error(e.code_str(), e.message());
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
