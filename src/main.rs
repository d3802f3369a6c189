//! `devsetup` command-line entry point.

use clap::Parser;

use devsetup_cli::{cli, commands};

fn main() {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = match cli::Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version go to stdout and succeed; usage errors exit 1.
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            std::process::exit(code);
        }
    };
    std::process::exit(commands::dispatch(&args));
}
