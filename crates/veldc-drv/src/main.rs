use std::process::ExitCode;

use veldc_drv::{compile_file, Config};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("veldc");

    let Some(config) = Config::from_args(&args[1..]) else {
        eprintln!("Usage: {program} [--verbose] FILENAME");
        return ExitCode::from(2);
    };

    match compile_file(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(1)
        }
    }
}
