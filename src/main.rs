use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::debug;

use trimmed_average::{
  decode_input, disassemble, encode_program, execute_into, parse_assembly, Engine, TrimConfig
};

#[derive(Parser, Debug)]
#[command(
  name = "trimmed-average",
  about = "Run a base64 encoded opcode stream through a rolling trimmed-mean calculator."
)]
struct Args {
  /// Read the stream from this file instead of standard input
  input: Option<PathBuf>,

  /// Initial window size
  #[arg(long, value_name = "N", default_value_t = 0)]
  window_size: u32,

  /// Initial lower absolute trim
  #[arg(long, value_name = "N", default_value_t = 0)]
  lower_abs: u8,

  /// Initial upper absolute trim
  #[arg(long, value_name = "N", default_value_t = 0)]
  upper_abs: u8,

  /// Initial lower proportional trim, in percent
  #[arg(long, value_name = "N", default_value_t = 0)]
  lower_prop: u8,

  /// Initial upper proportional trim, in percent
  #[arg(long, value_name = "N", default_value_t = 0)]
  upper_prop: u8,

  /// The input is assembly text rather than base64 lines
  #[arg(long, action = clap::ArgAction::SetTrue)]
  assembly: bool,

  /// Print the decoded instructions instead of running them
  #[arg(long, action = clap::ArgAction::SetTrue)]
  disassemble: bool,

  /// Also write the output lines to "<DIR>/<input stem>.out"
  #[arg(long, value_name = "DIR")]
  cache_dir: Option<PathBuf>,
}

impl Args {
  fn trim_config(&self) -> TrimConfig {
    TrimConfig {
      window_size : self.window_size,
      lower_abs   : self.lower_abs,
      upper_abs   : self.upper_abs,
      lower_prop  : self.lower_prop,
      upper_prop  : self.upper_prop,
    }
  }
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
  let args = Args::parse();

  if let Err(error) = run(&args) {
    eprintln!("error: {:#}", error);
    std::process::exit(1);
  }
}

fn run(args: &Args) -> anyhow::Result<()> {
  let bytes = load_stream(args)?;
  debug!("decoded {} bytes", bytes.len());

  let mut lines = Vec::new();
  let outcome =
    match args.disassemble {
      true  => disassemble(&bytes, &mut lines),
      false => {
        let mut engine = Engine::with_config(args.trim_config());
        execute_into(&bytes, &mut engine, &mut lines)
      }
    };
  debug!("produced {} lines", lines.len());

  // Lines produced before a malformed instruction are still written out.
  write_lines(&lines).context("failed to write to standard output")?;
  if let Some(dir) = &args.cache_dir {
    write_cache(dir, args.input.as_deref(), &lines)?;
  }

  outcome.context("malformed opcode stream")?;
  Ok(())
}

fn load_stream(args: &Args) -> anyhow::Result<Vec<u8>> {
  let bytes =
    match (&args.input, args.assembly) {
      (Some(path), false) => {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        decode_input(BufReader::new(file))
          .with_context(|| format!("failed to decode {}", path.display()))?
      }
      (None, false) => {
        decode_input(io::stdin().lock()).context("failed to decode standard input")?
      }
      (Some(path), true) => {
        let text =
          fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        assemble(&text).with_context(|| format!("failed to assemble {}", path.display()))?
      }
      (None, true) => {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("failed to read standard input")?;
        assemble(&text).context("failed to assemble standard input")?
      }
    };
  Ok(bytes)
}

fn assemble(text: &str) -> anyhow::Result<Vec<u8>> {
  let instructions = parse_assembly(text)?;
  Ok(encode_program(&instructions))
}

fn write_lines(lines: &[String]) -> io::Result<()> {
  let stdout = io::stdout();
  let mut out = BufWriter::new(stdout.lock());
  for line in lines {
    writeln!(out, "{}", line)?;
  }
  out.flush()
}

/// Writes `lines` to `<dir>/<stem>.out`, where `stem` is the input's file stem or `stdin`.
fn write_cache(dir: &Path, input: Option<&Path>, lines: &[String]) -> anyhow::Result<()> {
  let stem =
    input
      .and_then(Path::file_stem)
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_else(|| "stdin".to_string());
  let path = dir.join(format!("{}.out", stem));

  fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
  let mut contents = lines.join("\n");
  if !contents.is_empty() {
    contents.push('\n');
  }
  fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
  debug!("cached {} lines in {}", lines.len(), path.display());
  Ok(())
}
