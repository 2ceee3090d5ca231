//! EncFile CLI: key generation and signed-IV file containers
//!
//! Usage:
//!   encfile keygen  [--keys <dir>]
//!   encfile seal    --in <file> [--keys <dir>] [--id <label>]
//!   encfile open    --in <file>.enc [--keys <dir>] [--out <file>] [--force]
//!   encfile inspect <file>.enc
//!
//! Environment:
//!   ENCFILE_KEYS_DIR    - key directory when --keys is absent (default: ./keys)
//!   ENCFILE_LOG_FORMAT  - "json" for structured logging, "pretty" for dev
//!   RUST_LOG            - log filter (default: citadel_encfile=info,encfile=info)

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use citadel_encfile::label::sidecar_path;
use citadel_encfile::{
    generate_keypair, inspect, load_pair, persist, DefaultBinder, EncFileEngine, KeyPaths,
    SealedFile, SideChannelLabel, IV_BYTES, RSA_KEY_BITS,
};

const SEALED_EXT: &str = "enc";
const WRAPPED_KEY_SUFFIX: &str = ".key";

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::from(2);
    }

    let result = match args[1].as_str() {
        "keygen" => cmd_keygen(&args[2..]),
        "seal" => cmd_seal(&args[2..]),
        "open" => cmd_open(&args[2..]),
        "inspect" => cmd_inspect(&args[2..]),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("encfile {}", citadel_encfile::VERSION);
            Ok(())
        }
        cmd => {
            eprintln!("error: unknown command '{}'", cmd);
            print_usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let log_format = std::env::var("ENCFILE_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "citadel_encfile=info,encfile=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"encfile - signed-IV encrypted file containers

USAGE:
    encfile <COMMAND> [OPTIONS]

COMMANDS:
    keygen      Generate an RSA-{bits} key pair (public.key, private.key)
    seal        Encrypt a file, writing <FILE>.enc and <FILE>.enc.key
                (--id also writes the label to <FILE>.enc.id)
    open        Verify and decrypt <FILE>.enc into <FILE>
                (--out picks another path; --force overwrites an existing one)
    inspect     Show container layout (no verification)

EXAMPLES:
    encfile keygen --keys ./keys
    encfile seal --in report.pdf --keys ./keys --id quarterly
    encfile open --in report.pdf.enc --keys ./keys --out report-copy.pdf
    encfile inspect report.pdf.enc

OPTIONS:
    -h, --help       Print help
    -V, --version    Print version
"#,
        bits = RSA_KEY_BITS
    );
}

/// Flag parser shared by every command: `--name value` pairs plus bare switches.
struct Flags {
    pairs: Vec<(String, String)>,
    switches: Vec<String>,
}

impl Flags {
    fn parse(args: &[String], allowed: &[&str]) -> Result<Self, String> {
        Self::parse_with_switches(args, allowed, &[])
    }

    fn parse_with_switches(
        args: &[String],
        allowed: &[&str],
        switches: &[&str],
    ) -> Result<Self, String> {
        let mut pairs = Vec::new();
        let mut set = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let name = args[i].as_str();
            if switches.contains(&name) {
                set.push(name.to_string());
                i += 1;
                continue;
            }
            if !allowed.contains(&name) {
                return Err(format!("unknown option: {}", name));
            }
            i += 1;
            let value = args.get(i).ok_or_else(|| format!("missing value for {}", name))?;
            pairs.push((name.to_string(), value.clone()));
            i += 1;
        }
        Ok(Self {
            pairs,
            switches: set,
        })
    }

    fn has(&self, switch: &str) -> bool {
        self.switches.iter().any(|s| s == switch)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &str) -> Result<&str, String> {
        self.get(name).ok_or_else(|| format!("missing {}", name))
    }

    fn key_paths(&self) -> KeyPaths {
        self.get("--keys").map(KeyPaths::new).unwrap_or_else(KeyPaths::from_env)
    }
}

fn wrapped_key_path(sealed: &Path) -> PathBuf {
    let mut name = sealed.as_os_str().to_owned();
    name.push(WRAPPED_KEY_SUFFIX);
    PathBuf::from(name)
}

/// Where `open` writes plaintext: `--out`, else the input minus `.enc`
/// (or plus `.dec`). Existing files are only replaced with `--force`.
fn plaintext_path(input: &Path, explicit: Option<&str>, force: bool) -> Result<PathBuf, String> {
    let output = match explicit {
        Some(out) => PathBuf::from(out),
        None => match input.extension() {
            Some(ext) if ext == SEALED_EXT => input.with_extension(""),
            _ => {
                let mut name = input.as_os_str().to_owned();
                name.push(".dec");
                PathBuf::from(name)
            }
        },
    };
    if output == input {
        return Err("output path would overwrite input; pass a different --out".into());
    }
    if output.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite or --out to choose another path",
            output.display()
        ));
    }
    Ok(output)
}

fn cmd_keygen(args: &[String]) -> CmdResult {
    let flags = Flags::parse(args, &["--keys"])?;
    let paths = flags.key_paths();

    eprintln!("Generating RSA-{} key pair (this takes a while)...", RSA_KEY_BITS);
    let pair = generate_keypair(RSA_KEY_BITS)?;
    persist(&pair, &paths)?;

    eprintln!("Generated keypair:");
    eprintln!("  Public key:   {}", paths.public_key().display());
    eprintln!("  Private key:  {} (mode 600)", paths.private_key().display());
    Ok(())
}

fn cmd_seal(args: &[String]) -> CmdResult {
    let flags = Flags::parse(args, &["--in", "--keys", "--id"])?;
    let input = PathBuf::from(flags.require("--in")?);
    let pair = load_pair(&flags.key_paths())?;

    let plaintext = fs::read(&input)?;

    // One pair signs and receives: a local round-trip tool.
    let engine = EncFileEngine::<DefaultBinder>::new();
    let mut sealed = engine.seal(&plaintext, &pair.private, &pair.public)?;
    if let Some(id) = flags.get("--id") {
        sealed.container.set_id(id.as_bytes().to_vec());
    }

    let mut out_name = input.as_os_str().to_owned();
    out_name.push(".");
    out_name.push(SEALED_EXT);
    let out_path = PathBuf::from(out_name);
    let key_path = wrapped_key_path(&out_path);

    let container = sealed.container_bytes()?;
    fs::write(&out_path, &container)?;
    fs::write(&key_path, &sealed.wrapped_key)?;

    // The label is not part of the container bytes; keep it in a sidecar.
    let label_path = if sealed.container.label().is_empty() {
        // Drop a sidecar left by an earlier seal of the same file.
        match fs::remove_file(sidecar_path(&out_path)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        None
    } else {
        Some(sealed.container.label().store_beside(&out_path)?)
    };

    tracing::info!(
        id = %String::from_utf8_lossy(sealed.container.id()),
        output = %out_path.display(),
        "sealed"
    );
    eprintln!("Encrypted {} bytes -> {} bytes", plaintext.len(), container.len());
    eprintln!("Container:    {}", out_path.display());
    eprintln!("Wrapped key:  {}", key_path.display());
    if let Some(path) = label_path {
        eprintln!("Label:        {}", path.display());
    }
    Ok(())
}

fn cmd_open(args: &[String]) -> CmdResult {
    let flags = Flags::parse_with_switches(args, &["--in", "--keys", "--out"], &["--force"])?;
    let input = PathBuf::from(flags.require("--in")?);
    let output = plaintext_path(&input, flags.get("--out"), flags.has("--force"))?;

    let pair = load_pair(&flags.key_paths())?;
    let container = fs::read(&input)?;
    let wrapped_key = fs::read(wrapped_key_path(&input))?;

    let engine = EncFileEngine::<DefaultBinder>::new();
    let mut sealed = SealedFile::from_parts(&container, wrapped_key)?;
    if let Some(label) = SideChannelLabel::load_beside(&input)? {
        sealed.container.set_id(label.as_bytes().to_vec());
    }
    let plaintext = engine.open(&mut sealed, &pair.public, &pair.private)?;

    fs::write(&output, &plaintext)?;
    eprintln!("Decrypted {} bytes -> {} bytes", container.len(), plaintext.len());
    eprintln!("Output: {}", output.display());
    if !sealed.container.id().is_empty() {
        eprintln!("Label:  {}", String::from_utf8_lossy(sealed.container.id()));
    }
    Ok(())
}

fn cmd_inspect(args: &[String]) -> CmdResult {
    let path = Path::new(args.first().ok_or("missing file path")?);
    let data = fs::read(path)?;
    let info = inspect::<DefaultBinder>(&data)?;
    let label = SideChannelLabel::load_beside(path)?;

    println!("EncFile Container");
    println!("=================");
    println!("IV:              {}", info.iv_hex);
    println!("Signature:       {} ({} bytes)", info.signature_scheme, info.header_bytes - IV_BYTES);
    println!("Header Size:     {} bytes", info.header_bytes);
    println!("Payload Size:    {} bytes", info.payload_bytes);
    println!("Total Size:      {} bytes", info.total_bytes);
    if let Some(label) = label {
        println!("Label:           {} (from sidecar, unsigned)", String::from_utf8_lossy(label.as_bytes()));
    }
    println!();
    println!("Signature not checked. Use `encfile open` to verify.");
    Ok(())
}
