//! KSPACK CLI - Command-line tool for the KSPACK binary format
//!
//! This binary provides command-line interfaces for:
//! - encode: JSON document → codec bytes
//! - decode: codec bytes → JSON document
//! - dump: one line per entry of a KSPACK buffer
//! - codecs: list registered codec names

use clap::{ArgAction, Args, Parser, Subcommand};
use kspack::codecs::{JsonCodec, KSPACK};
use kspack::{Codec, CodecRegistry, EntryInfo, KspackCodec, Limits};
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kspack")]
#[command(about = "KSPACK tagged binary serialization CLI tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[command(flatten)]
    limits: LimitArgs,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum container nesting depth
    #[arg(long, global = true, default_value_t = Limits::default().max_depth)]
    max_depth: usize,
    /// Maximum input size in bytes
    #[arg(long, global = true, default_value_t = Limits::default().max_input_len)]
    max_input_bytes: usize,
}

impl LimitArgs {
    fn to_limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_input_len: self.max_input_bytes,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON document with the chosen codec
    ///
    /// Examples:
    ///   kspack encode order.json -o order.ksp
    ///   kspack encode order.json --codec json
    Encode {
        /// Input file (JSON)
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Codec name from the registry
        #[arg(long, default_value = KSPACK)]
        codec: String,
    },
    /// Decode codec bytes to a JSON document
    Decode {
        /// Input file
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Codec name from the registry
        #[arg(long, default_value = KSPACK)]
        codec: String,
        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print one line per entry of a KSPACK buffer
    Dump {
        /// Input file
        input: PathBuf,
    },
    /// List registered codecs
    Codecs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let limits = cli.limits.to_limits();
    match cli.command {
        Commands::Encode {
            input,
            output,
            codec,
        } => handle_encode(&input, output.as_deref(), &codec, limits),
        Commands::Decode {
            input,
            output,
            codec,
            pretty,
        } => handle_decode(&input, output.as_deref(), &codec, pretty, limits),
        Commands::Dump { input } => handle_dump(&input, limits),
        Commands::Codecs => handle_codecs(),
    }
}

fn handle_encode(
    input: &Path,
    output: Option<&Path>,
    codec_name: &str,
    limits: Limits,
) -> Result<(), Box<dyn Error>> {
    let codec = resolve_codec(codec_name, &limits)?;
    let text = read_input(input, &limits)?;
    let json: &dyn Codec = &JsonCodec::new();
    let value = json.unmarshal(&text)?;
    let bytes = codec.marshal(&value)?;
    tracing::info!(
        codec = codec.name(),
        input_bytes = text.len(),
        output_bytes = bytes.len(),
        "encoded document"
    );
    write_output(output, &bytes)
}

fn handle_decode(
    input: &Path,
    output: Option<&Path>,
    codec_name: &str,
    pretty: bool,
    limits: Limits,
) -> Result<(), Box<dyn Error>> {
    let codec = resolve_codec(codec_name, &limits)?;
    let bytes = read_input(input, &limits)?;
    let value = codec.unmarshal(&bytes)?;
    let json = if pretty {
        JsonCodec::pretty()
    } else {
        JsonCodec::new()
    };
    let mut text = json.marshal(&value)?;
    text.push(b'\n');
    tracing::info!(
        codec = codec.name(),
        input_bytes = bytes.len(),
        kind = value.kind(),
        "decoded document"
    );
    write_output(output, &text)
}

fn handle_dump(input: &Path, limits: Limits) -> Result<(), Box<dyn Error>> {
    let bytes = read_input(input, &limits)?;
    let mut lines = String::new();
    kspack::walk(&bytes, &limits, |info| {
        lines.push_str(&format_entry(info));
        lines.push('\n');
    })?;
    write_output(None, lines.as_bytes())
}

fn handle_codecs() -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for name in CodecRegistry::global().names() {
        writeln!(handle, "{}", name)?;
    }
    Ok(())
}

/// The KSPACK codec is built with the command-line limits; other names come
/// from the registry as registered.
fn resolve_codec(name: &str, limits: &Limits) -> Result<Box<dyn Codec>, Box<dyn Error>> {
    if name == KSPACK {
        return Ok(Box::new(KspackCodec::with_limits(limits.clone())));
    }
    let registry = CodecRegistry::global();
    registry.instance(name).ok_or_else(|| {
        format!(
            "Unknown codec '{}'. Available codecs: {}",
            name,
            registry.names().join(", ")
        )
        .into()
    })
}

fn read_input(path: &Path, limits: &Limits) -> Result<Vec<u8>, Box<dyn Error>> {
    let len = fs::metadata(path)
        .map_err(|err| format!("{}: {}", path.display(), err))?
        .len();
    limits.check_input_len(usize::try_from(len).unwrap_or(usize::MAX))?;
    Ok(fs::read(path)?)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => fs::write(path, bytes)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn format_entry(info: &EntryInfo) -> String {
    let mut line = format!(
        "{:08x} {}{}",
        info.offset,
        "  ".repeat(info.depth),
        info.tag.name()
    );
    if !info.key.is_empty() {
        let _ = write!(line, " {:?}", info.key);
    }
    if let Some(count) = info.count {
        let _ = write!(line, " count={}", count);
    }
    if let Some(len) = info.content_len {
        let _ = write!(line, " len={}", len);
    }
    if let Some(value) = info.value.as_deref() {
        let _ = write!(line, " = {}", value);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use kspack::Tag;

    #[test]
    fn test_format_entry() {
        let info = EntryInfo {
            depth: 1,
            offset: 10,
            tag: Tag::ShortString,
            key: "Name".to_string(),
            content_len: Some(2),
            count: None,
            value: Some("\"a\"".to_string()),
        };
        assert_eq!(
            format_entry(&info),
            "0000000a   short-string \"Name\" len=2 = \"a\""
        );
    }

    #[test]
    fn test_cli_parses_limits() {
        let cli = Cli::try_parse_from(["kspack", "dump", "x.ksp", "--max-depth", "4"]).unwrap();
        assert_eq!(cli.limits.to_limits().max_depth, 4);
        assert_eq!(
            cli.limits.to_limits().max_input_len,
            Limits::default().max_input_len
        );
    }
}
