//! v2gcodec CLI — XML/JSON <-> EXI conversion for ISO 15118-20 messages.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::{IsTerminal, Read, Write};
use std::process;

use clap::{Args, Parser, Subcommand};
use v2gcodec::{Error, MessageType, Runtime, binary};

#[derive(Parser)]
#[command(name = "v2gcodec", version, about = "XML/JSON <-> EXI conversion for ISO 15118-20 CommonMessages")]
struct Cli {
    /// More log output (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML (or JSON with --message-type) to EXI
    Encode(EncodeArgs),
    /// Decode EXI to XML (or JSON with --message-type)
    Decode(DecodeArgs),
    /// Print the library version
    Version,
    /// List message type ids and element names
    MessageTypes,
}

#[derive(Args)]
struct CommonArgs {
    /// Schema file or directory (.xsd), repeatable; later files win on name collisions
    #[arg(short, long = "schema", required = true, num_args = 1..)]
    schemas: Vec<String>,

    /// Message type (name or id); switches the document side to JSON
    #[arg(short = 't', long)]
    message_type: Option<MessageType>,

    /// Input file (- for stdin)
    #[arg(short, long)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// EXI side as hex text instead of raw bytes
    #[arg(long)]
    hex: bool,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Pretty-printed XML output (2-space indent)
    #[arg(long)]
    pretty: bool,

    /// Prepend an XML declaration
    #[arg(long)]
    xml_declaration: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Fehler: {e}");
        process::exit(e.kind().status_code());
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.format_timestamp(None).init();
}

fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
        Command::Version => {
            println!("v2gcodec {}", v2gcodec::runtime::version());
            Ok(())
        }
        Command::MessageTypes => {
            for message in MessageType::ALL {
                println!("{:>3}  {}", message.id(), message.name());
            }
            Ok(())
        }
    }
}

fn open_runtime(common: &CommonArgs) -> Result<Runtime, Error> {
    let runtime = Runtime::new();
    runtime.initialize()?;
    runtime.register_schemas(&common.schemas)?;
    Ok(runtime)
}

fn run_encode(args: EncodeArgs) -> Result<(), Error> {
    let common = &args.common;
    let runtime = open_runtime(common)?;
    let input = read_input(&common.input)?;

    let exi = match common.message_type {
        Some(message) => runtime.encode_struct(message, &input)?,
        None => {
            let text = std::str::from_utf8(&input)
                .map_err(|e| Error::XmlParseError(format!("input is not UTF-8: {e}")))?;
            runtime.encode_xml(text)?
        }
    };
    log::info!("{} -> {} bytes EXI", input.len(), exi.len());

    if common.hex {
        let mut text = binary::to_hex(&exi, true);
        text.push('\n');
        write_output(common.output.as_deref(), text.as_bytes())
    } else {
        write_output(common.output.as_deref(), &exi)
    }
}

fn run_decode(args: DecodeArgs) -> Result<(), Error> {
    let common = &args.common;
    let runtime = open_runtime(common)?;
    runtime.set_option("pretty-xml", bool_text(args.pretty))?;
    runtime.set_option("xml-declaration", bool_text(args.xml_declaration))?;

    let input = read_input(&common.input)?;
    let exi = if common.hex {
        let text = std::str::from_utf8(&input)
            .map_err(|e| Error::InvalidArgument(format!("hex input is not UTF-8: {e}")))?;
        let compact: String = text.split_whitespace().collect();
        binary::parse_hex(&compact).map_err(|e| Error::InvalidArgument(e.to_string()))?
    } else {
        input
    };

    let mut out = match common.message_type {
        Some(message) => runtime.decode_struct(message, &exi)?,
        None => runtime.decode_exi(&exi)?.into_bytes(),
    };
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    write_output(common.output.as_deref(), &out)
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn read_input(path: &str) -> Result<Vec<u8>, Error> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| Error::InvalidArgument(format!("Lesefehler (stdin): {e}")))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| Error::InvalidArgument(format!("Lesefehler '{path}': {e}")))
    }
}

fn write_output(path: Option<&str>, data: &[u8]) -> Result<(), Error> {
    let result = match path {
        None | Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data).and_then(|()| stdout.flush())
        }
        Some(path) => std::fs::write(path, data),
    };
    result.map_err(|e| Error::InvalidArgument(format!("Schreibfehler: {e}")))
}
