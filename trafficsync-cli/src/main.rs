//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

#[expect(
    clippy::print_stderr,
    reason = "fatal errors are reported on stderr before exiting"
)]
fn main() {
    if let Err(err) = trafficsync_cli::run() {
        eprintln!("trafficsync: {err}");
        std::process::exit(1);
    }
}
