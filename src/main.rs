use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser as ClapParser;

use lox::runner::Lox;

#[derive(ClapParser, Debug)]
#[command(name = "lox", version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    /// Script to execute; starts the REPL when omitted.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{}", e);
            return Ok(());
        }

        Err(_) => {
            eprintln!("Usage: lox [script]");
            std::process::exit(64);
        }
    };

    match args.script {
        Some(path) => run_file(&path),

        None => run_prompt(),
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let source: String =
        fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;

    let mut lox = Lox::new(io::stdout(), io::stderr());

    lox.run(&source);

    let code = lox.exit_code();

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut prompt = io::stdout();

    let mut lox = Lox::new(io::stdout(), io::stderr());

    loop {
        write!(prompt, "> ")?;
        prompt.flush()?;

        let mut line = String::new();

        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let mut source = trimmed.to_string();

        // The grammar has no empty statement, so only bare expressions and
        // unterminated statements get the convenience semicolon.
        if !source.ends_with(';') && !source.ends_with('}') {
            source.push(';');
        }

        lox.run_repl_line(&source);

        // Errors never end the session.
        lox.reset();
    }

    Ok(())
}
