use drawmacro::store::StoreError;
use drawmacro::{
    Codec, CodecConfig, DecodeOptions, DiagramModel, DiagramService, DocumentStore, ServiceError,
};
use futures::executor::block_on;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Codec(drawmacro::Error),
    Service(ServiceError),
    Json(serde_json::Error),
}

impl CliError {
    fn is_not_found(&self) -> bool {
        let codec = match self {
            CliError::Codec(err) => Some(err),
            CliError::Service(err) => err.codec(),
            _ => None,
        };
        matches!(codec, Some(drawmacro::Error::MacroNotFound { .. }))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Codec(err) => write!(f, "{err}"),
            CliError::Service(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<drawmacro::Error> for CliError {
    fn from(value: drawmacro::Error) -> Self {
        Self::Codec(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    List,
    Get,
    Create,
    Update,
}

#[derive(Debug, Default)]
struct Args {
    command: Option<Command>,
    input: Option<String>,
    pretty: bool,
    with_meta: bool,
    strict: bool,
    xml: bool,
    config: Option<String>,
    overrides: Vec<(String, Value)>,
    macro_id: Option<String>,
    name: Option<String>,
    model: Option<String>,
}

/// A store over files on disk. The document id is the file path.
struct FileStore;

impl DocumentStore for FileStore {
    async fn fetch_body(&self, document_id: &str) -> Result<String, StoreError> {
        Ok(std::fs::read_to_string(document_id)?)
    }

    async fn replace_body(&self, document_id: &str, body: &str) -> Result<(), StoreError> {
        Ok(std::fs::write(document_id, body)?)
    }
}

fn usage() -> &'static str {
    "drawmacro\n\
\n\
USAGE:\n\
  drawmacro encode [--xml] [--config <path>] [--set <key>=<value>]... [<model.json>|-]\n\
  drawmacro decode [--pretty] [--meta] [--strict] [<payload>|-]\n\
  drawmacro list   [--pretty] <document>\n\
  drawmacro get    --macro-id <id> [--pretty] [--strict] <document>\n\
  drawmacro create --name <name> --model <model.json> [--config <path>] [--set <key>=<value>]... <document>\n\
  drawmacro update --macro-id <id> --model <model.json> [--config <path>] [--set <key>=<value>]... <document>\n\
\n\
NOTES:\n\
  - If <model.json> or <payload> is omitted or '-', input is read from stdin.\n\
  - encode prints the base64 payload; --xml prints the envelope XML instead.\n\
  - decode prints the model JSON; --meta wraps it with the decode status.\n\
  - <document> is a storage-format file; create and update rewrite it in place.\n\
  - --config merges a JSON file over the built-in codec settings.\n\
  - --set overrides one dotted key after --config; the value is JSON, or a plain string.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "encode" | "decode" | "list" | "get" | "create" | "update" if args.command.is_none() => {
                args.command = Some(match a.as_str() {
                    "encode" => Command::Encode,
                    "decode" => Command::Decode,
                    "list" => Command::List,
                    "get" => Command::Get,
                    "create" => Command::Create,
                    _ => Command::Update,
                });
            }
            "--set" => {
                let Some((key, raw)) = it.next().and_then(|kv| kv.split_once('=')) else {
                    return Err(CliError::Usage(usage()));
                };
                if key.is_empty() {
                    return Err(CliError::Usage(usage()));
                }
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
                args.overrides.push((key.to_string(), value));
            }
            "--pretty" => args.pretty = true,
            "--meta" => args.with_meta = true,
            "--strict" => args.strict = true,
            "--xml" => args.xml = true,
            "--config" | "--macro-id" | "--name" | "--model" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let slot = match a.as_str() {
                    "--config" => &mut args.config,
                    "--macro-id" => &mut args.macro_id,
                    "--name" => &mut args.name,
                    _ => &mut args.model,
                };
                *slot = Some(value.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn read_model(input: Option<&str>) -> Result<DiagramModel, CliError> {
    Ok(serde_json::from_str(&read_input(input)?)?)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn build_codec(args: &Args) -> Result<Codec, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => CodecConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CodecConfig::defaults(),
    };
    for (key, value) in &args.overrides {
        config.set_value(key, value.clone());
    }
    let mut codec = Codec::new().with_config(config);
    if args.strict {
        codec = codec.with_decode_options(DecodeOptions::strict());
    }
    Ok(codec)
}

fn required<'a>(value: &'a Option<String>) -> Result<&'a str, CliError> {
    value.as_deref().ok_or(CliError::Usage(usage()))
}

fn run(args: Args) -> Result<(), CliError> {
    let Some(command) = args.command else {
        return Err(CliError::Usage(usage()));
    };
    let codec = build_codec(&args)?;

    match command {
        Command::Encode => {
            let model = read_model(args.input.as_deref())?;
            let out = if args.xml {
                block_on(codec.encode_xml(&model))?
            } else {
                block_on(codec.encode(&model))?
            };
            println!("{out}");
        }
        Command::Decode => {
            let payload = read_input(args.input.as_deref())?;
            let decoded = block_on(codec.decode(&payload))?;
            if args.with_meta {
                write_json(&decoded, args.pretty)?;
            } else {
                write_json(&decoded.model, args.pretty)?;
            }
        }
        Command::List => {
            let document = required(&args.input)?;
            let service = DiagramService::with_codec(FileStore, codec);
            write_json(&block_on(service.list(document))?, args.pretty)?;
        }
        Command::Get => {
            let document = required(&args.input)?;
            let macro_id = required(&args.macro_id)?;
            let service = DiagramService::with_codec(FileStore, codec);
            write_json(&block_on(service.get(document, macro_id))?, args.pretty)?;
        }
        Command::Create => {
            let document = required(&args.input)?;
            let name = required(&args.name)?;
            let model = read_model(Some(required(&args.model)?))?;
            let service = DiagramService::with_codec(FileStore, codec);
            println!("{}", block_on(service.create(document, name, &model))?);
        }
        Command::Update => {
            let document = required(&args.input)?;
            let macro_id = required(&args.macro_id)?;
            let model = read_model(Some(required(&args.model)?))?;
            let service = DiagramService::with_codec(FileStore, codec);
            block_on(service.update(document, macro_id, &model))?;
        }
    }
    Ok(())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) if err.is_not_found() => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
