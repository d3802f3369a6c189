//! Command: print version information.

/// Print the program version to stdout.
pub fn run() {
    println!("devsetup {}", super::program_version());
}
