use ansi_rgb::{green, Foreground};
use clap::{arg, command, ErrorKind};
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::fs;
use std::process;

use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::scanner::Scanner;

mod ast_printer;
mod environment;
mod expr;
mod function;
mod interpreter;
mod parser;
mod scanner;
mod types;

/// Which pipeline stage failed, for exit-code selection.
enum RunError {
    Static,
    Runtime,
}

fn main() {
    let matches = match command!()
        .arg(arg!([script] "Lox source file; omit it for an interactive prompt"))
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(64);
        }
    };
    if let Some(filename) = matches.value_of("script") {
        run_file(filename);
    } else {
        run_prompt();
    }
}

fn run_file(filename: &str) {
    let contents = fs::read_to_string(filename).expect("Something went wrong reading the file");
    let mut interpreter = Interpreter::new();
    match run(&contents, &mut interpreter) {
        Err(RunError::Static) => process::exit(65),
        Err(RunError::Runtime) => process::exit(70),
        Ok(()) => {}
    }
}

/// Runs one source unit through the full pipeline. Every static diagnostic
/// is reported before giving up; nothing executes after a static error.
fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), RunError> {
    let mut scanner = Scanner::new(source);
    let scan_errors = scanner.scan_tokens();
    for e in &scan_errors {
        eprintln!("{}", e);
    }
    let (statements, parse_errors) = Parser::new(scanner.tokens).parse();
    for e in &parse_errors {
        eprintln!("{}", e);
    }
    if !scan_errors.is_empty() || !parse_errors.is_empty() {
        return Err(RunError::Static);
    }
    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e);
        return Err(RunError::Runtime);
    }
    Ok(())
}

fn run_prompt() {
    let mut rl = Editor::<()>::new();
    let history_path = "history.txt";
    if rl.load_history(history_path).is_err() {
        println!("No previous history.");
    }
    let mut interpreter = Interpreter::new();
    loop {
        let read_line = rl.readline(&"> ".fg(green()).to_string());
        match read_line {
            Ok(line) => {
                rl.add_history_entry(line.as_str());
                // Diagnostics are already printed; the next line starts clean.
                let _ = run(&line, &mut interpreter);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(history_path).unwrap();
}
