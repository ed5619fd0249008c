use std::fs;
use std::io::{self, BufRead};
use std::process;

use clap::Parser as ClapParser;
use colored::Colorize;

use glint::interpreter::Interpreter;
use glint::irgen;
use glint::semantic;
use glint::source::parse_source;

#[derive(ClapParser)]
#[command(name = "glint", about = "The Glint language interpreter")]
struct Cli {
    /// Source file to run; reads stdin until a line `END` when omitted
    file: Option<String>,
    /// Print the lowered IR before executing
    #[arg(long)]
    emit_ir: bool,
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot open file '{}': {}", path, e))
}

fn read_stdin_source() -> String {
    let stdin = io::stdin();
    let mut source = String::new();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line == "END" {
            break;
        }
        source.push_str(&line);
        source.push('\n');
    }
    source
}

fn main() {
    let cli = Cli::parse();

    let source = match &cli.file {
        Some(path) => match read_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}", e.red());
                process::exit(1);
            }
        },
        None => read_stdin_source(),
    };

    process::exit(run_source(&source, cli.emit_ir));
}

fn run_source(source: &str, emit_ir: bool) -> i32 {
    let program = match parse_source(source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return 1;
        }
    };

    // Semantic diagnostics are reported but never block execution
    let analysis = semantic::analyze(&program);
    for err in &analysis.errors {
        eprintln!("{} {}", "Semantic Error:".yellow(), err.message);
    }

    let ir = irgen::generate(&program);
    if emit_ir {
        print!("{}", ir);
    }

    let mut interp = Interpreter::new();
    match interp.run(&ir) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            1
        }
    }
}
