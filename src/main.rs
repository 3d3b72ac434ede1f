use clap::Parser;

use certops::cli::{self, Command};

fn main() {
    match cli::execute(Command::parse()) {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            println!("Error: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    }
}
