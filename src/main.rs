//! Runs a program image on a single machine.
//!
//! Reads the comma-separated image from stdin, seeds the input channel from
//! the command line, and prints every emitted value on its own line.
//!
//! # Usage
//! ```text
//! intcode [OPTIONS] < program.txt
//! ```
//!
//! # Options
//! - `--input <n>`: seed the input channel with `n` (repeatable, in order)
//! - `--snapshot`: also print the final memory image after halt

use intcode::fabric;
use intcode::machine::program::Program;
use std::env;
use std::io::Read;
use std::process;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let mut inputs: Vec<i64> = Vec::new();
    let mut snapshot = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--input requires an argument");
                    process::exit(1);
                }
                match args[i].parse() {
                    Ok(value) => inputs.push(value),
                    Err(_) => {
                        eprintln!("Invalid input value: {}", args[i]);
                        process::exit(1);
                    }
                }
            }
            "--snapshot" => snapshot = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut text = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut text) {
        eprintln!("Failed to read program image from stdin: {}", err);
        process::exit(1);
    }

    let program: Program = match text.parse() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Invalid program image: {}", err);
            process::exit(1);
        }
    };

    let machine = match fabric::run_single(&program, &inputs).await {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("Execution failed: {}", err);
            process::exit(1);
        }
    };

    for value in machine.drain_output() {
        println!("{}", value);
    }

    if snapshot {
        let cells: Vec<String> = machine.snapshot().iter().map(i64::to_string).collect();
        println!("{}", cells.join(","));
    }
}

fn print_usage(name: &str) {
    eprintln!("Usage: {} [OPTIONS] < program.txt", name);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --input <n>   Seed the input channel with n (repeatable)");
    eprintln!("  --snapshot    Print the final memory image after halt");
    eprintln!("  -h, --help    Show this help");
}
