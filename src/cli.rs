// Command-line interface for romdelta.
//
// Subcommands: encode, decode, tokens (stream listing), config.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::delta::{self, Token, TokenIterator};
use crate::io::{decode_file, encode_file};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Delta codec for fixed-size ROM images.
#[derive(Parser, Debug)]
#[command(
    name = "romdelta",
    version,
    about = "ROM image delta encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a diff stream turning a reference image into a target image.
    Encode(EncodeArgs),
    /// Decode a diff stream against a reference image.
    Decode(DecodeArgs),
    /// Print a token listing of a diff stream.
    Tokens(TokensArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Reference image file.
    #[arg(value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Target image file (must match the reference length).
    #[arg(value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Output diff stream file (omit with -c for stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Write the stream to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Decode the freshly written stream and check it against the target.
    #[arg(long)]
    verify: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Reference image file.
    #[arg(value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Input diff stream file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,

    /// Output image file (omit with -c for stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Write the image to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,
}

#[derive(Args, Debug)]
struct TokensArgs {
    /// Diff stream file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

struct Global {
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn check_output_path(path: &PathBuf, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "romdelta: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return false;
    }
    true
}

fn write_stdout(data: &[u8]) -> i32 {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
        eprintln!("romdelta: stdout: {e}");
        return 1;
    }
    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(g: &Global, args: &EncodeArgs) -> i32 {
    if args.stdout || args.output.is_none() {
        // In-memory path: stream goes to stdout, no stats file.
        let reference = match std::fs::read(&args.reference) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("romdelta: reference file: {}: {e}", args.reference.display());
                return 1;
            }
        };
        let target = match std::fs::read(&args.target) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("romdelta: target file: {}: {e}", args.target.display());
                return 1;
            }
        };
        let stream = match delta::encode(&reference, &target) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("romdelta: encode error: {e}");
                return 1;
            }
        };
        if args.verify {
            match delta::decode(&reference, &stream) {
                Ok(decoded) if decoded == target => {}
                Ok(_) => {
                    eprintln!("romdelta: round-trip verification failed");
                    return 1;
                }
                Err(e) => {
                    eprintln!("romdelta: round-trip verification failed: {e}");
                    return 1;
                }
            }
        }
        return write_stdout(&stream);
    }

    let output = args.output.as_ref().unwrap();
    if !check_output_path(output, g.force) {
        return 1;
    }

    let stats = match encode_file(&args.reference, &args.target, output, args.verify) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("romdelta: {}: {e}", output.display());
            return 1;
        }
    };

    if g.verbose > 0 && !g.quiet {
        eprintln!(
            "romdelta: encoder: image size: {}, stream size: {}, tokens: {}",
            stats.target_size, stats.delta_size, stats.tokens
        );
    }

    if g.json_output {
        let json = serde_json::json!({
            "command": "encode",
            "reference_size": stats.reference_size,
            "target_size": stats.target_size,
            "delta_size": stats.delta_size,
            "tokens": stats.tokens,
            "verified": stats.verified,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(g: &Global, args: &DecodeArgs) -> i32 {
    if args.stdout || args.output.is_none() {
        let reference = match std::fs::read(&args.reference) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("romdelta: reference file: {}: {e}", args.reference.display());
                return 1;
            }
        };
        let stream = match std::fs::read(&args.delta) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("romdelta: delta file: {}: {e}", args.delta.display());
                return 1;
            }
        };
        let output = match delta::decode(&reference, &stream) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("romdelta: decode error: {e}");
                return 1;
            }
        };
        return write_stdout(&output);
    }

    let output = args.output.as_ref().unwrap();
    if !check_output_path(output, g.force) {
        return 1;
    }

    let stats = match decode_file(&args.reference, &args.delta, output) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("romdelta: {}: {e}", output.display());
            return 1;
        }
    };

    if g.verbose > 0 && !g.quiet {
        eprintln!(
            "romdelta: decoder: output size: {}, tokens: {}",
            stats.output_size, stats.tokens
        );
    }

    if g.json_output {
        let json = serde_json::json!({
            "command": "decode",
            "reference_size": stats.reference_size,
            "delta_size": stats.delta_size,
            "output_size": stats.output_size,
            "tokens": stats.tokens,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }

    0
}

// ---------------------------------------------------------------------------
// Tokens command
// ---------------------------------------------------------------------------

fn cmd_tokens(args: &TokensArgs) -> i32 {
    let stream = match std::fs::read(&args.delta) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("romdelta: {}: {e}", args.delta.display());
            return 1;
        }
    };

    println!("  Stream  Output  Kind     Len   Addr  Patches");
    let mut out_ofs = 0usize;
    for item in TokenIterator::new(&stream) {
        let (pos, token) = match item {
            Ok(x) => x,
            Err(e) => {
                eprintln!("romdelta: token listing: {e}");
                return 1;
            }
        };
        match &token {
            Token::Literal1(_) => {
                println!("  {pos:06x}  {out_ofs:06x}  LIT1       1");
            }
            Token::Literal2(..) => {
                println!("  {pos:06x}  {out_ofs:06x}  LIT2       2");
            }
            Token::Exact { len, addr } => {
                println!("  {pos:06x}  {out_ofs:06x}  EXACT   {len:4}  {addr:05x}");
            }
            Token::Approx {
                len, addr, patches, ..
            } => {
                println!(
                    "  {pos:06x}  {out_ofs:06x}  APPROX  {len:4}  {addr:05x}  {:7}",
                    patches.len()
                );
            }
        }
        out_ofs += token.target_len();
    }
    println!("  total: {out_ofs} output bytes from {} stream bytes", stream.len());

    0
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("romdelta version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    eprintln!("FILE_IO={file_io}");
    eprintln!("MAX_IMAGE_LEN={}", delta::MAX_IMAGE_LEN);
    eprintln!("MAX_EXACT_LEN={}", delta::MAX_EXACT_LEN);
    eprintln!("MAX_APPROX_LEN={}", delta::MAX_APPROX_LEN);

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let g = Global {
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
    };

    let exit_code = match &cli.command {
        Cmd::Encode(args) => cmd_encode(&g, args),
        Cmd::Decode(args) => cmd_decode(&g, args),
        Cmd::Tokens(args) => cmd_tokens(args),
        Cmd::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv: Vec<String> = std::iter::once("romdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).expect("cli parse failed")
    }

    #[test]
    fn encode_subcommand_maps_correctly() {
        let cli = parse(&["encode", "ref.rom", "new.rom", "out.delta", "--verify"]);
        match cli.command {
            Cmd::Encode(args) => {
                assert_eq!(args.reference, PathBuf::from("ref.rom"));
                assert_eq!(args.target, PathBuf::from("new.rom"));
                assert_eq!(args.output, Some(PathBuf::from("out.delta")));
                assert!(args.verify);
                assert!(!args.stdout);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decode_subcommand_maps_correctly() {
        let cli = parse(&["--quiet", "decode", "ref.rom", "in.delta", "out.rom"]);
        assert!(cli.quiet);
        match cli.command {
            Cmd::Decode(args) => {
                assert_eq!(args.reference, PathBuf::from("ref.rom"));
                assert_eq!(args.delta, PathBuf::from("in.delta"));
                assert_eq!(args.output, Some(PathBuf::from("out.rom")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_stdio_and_force_flags() {
        let cli = parse(&["--force", "encode", "--stdout", "ref.rom", "new.rom"]);
        assert!(cli.force);
        match cli.command {
            Cmd::Encode(args) => {
                assert!(args.stdout);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verbose_counts() {
        let cli = parse(&["-v", "-v", "tokens", "in.delta"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Cmd::Tokens(_)));
    }

    #[test]
    fn config_command_maps() {
        assert!(matches!(parse(&["config"]).command, Cmd::Config));
    }
}
