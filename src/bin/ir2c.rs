//! Command-line front end: loads a JSON-encoded IR module, lifts it, and
//! writes the reconstructed C source to a file or stdout.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ir2c::ir::IrModule;
use ir2c::{lift, write, LiftError};

/// Lifts an IR module back into compilable C source.
#[derive(Parser, Debug)]
#[command(name = "ir2c", version, about)]
struct Cli {
  /// Path to the JSON-encoded IR module, or `-` to read from stdin.
  input: PathBuf,

  /// Where to write the generated C source; defaults to stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Emit `#include` lines for the standard headers the program uses.
  #[arg(long)]
  includes: bool,

  /// Suppress explicit function-pointer casts at indirect call sites.
  #[arg(long)]
  no_func_casts: bool,
}

fn read_input(path: &PathBuf) -> io::Result<String> {
  if path.as_os_str() == "-" {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
  } else {
    std::fs::read_to_string(path)
  }
}

fn run(cli: Cli) -> Result<(), LiftError> {
  let text = read_input(&cli.input)?;
  let module: IrModule = serde_json::from_str(&text)
    .map_err(|e| LiftError::IllFormedMetadata { detail: format!("invalid IR module JSON: {e}") })?;

  let mut ctx = lift(&module)?;
  ctx.emit_includes = cli.includes;
  ctx.no_func_casts = cli.no_func_casts;

  let rendered = write::write_program(&ctx);

  match cli.output {
    Some(path) => {
      let mut f = File::create(path)?;
      f.write_all(rendered.as_bytes())?;
    }
    None => io::stdout().write_all(rendered.as_bytes())?,
  }
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();
  let cli = Cli::parse();
  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{e}");
      ExitCode::FAILURE
    }
  }
}
