use std::io::Read;

use snowpc_cli::{run, CliError, Options};
use structopt::StructOpt;

/// If SNOWPC_DEBUG_STOP is set (and not `0`), print our PID and wait for a
/// byte on stdin so a debugger can attach before anything happens.
fn debug_stop() {
    let flag = std::env::var("SNOWPC_DEBUG_STOP").unwrap_or_default();
    if flag.is_empty() || flag == "0" {
        return;
    }
    eprintln!("SNOWPC_DEBUG_STOP: pid {}", std::process::id());
    eprint!("Attach debugger and press enter to continue...");
    let mut buf = [0u8; 1];
    let _ = std::io::stdin().read(&mut buf);
}

fn main_with_err() -> Result<(), CliError> {
    debug_stop();
    run(Options::from_args())
}

fn main() {
    if let Err(err) = main_with_err() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
