//! `ticket-crypt` command line front end.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use zeroize::Zeroize;

use ticket_crypt::{
    Algorithm, Config, EncryptedSidecar, EncryptionRecord, HistoryStore, JobOutput, Request,
    Response, Session, Ticket, Worker, default_decrypt_output_path, default_sidecar_path,
    write_all_atomic,
};

#[derive(Parser, Debug)]
#[command(
    name = "ticket-crypt",
    version,
    about = "Encrypt/decrypt files with a random per-file ticket"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "TICKET_CRYPT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long, env = "TICKET_CRYPT_LOG", global = true)]
    log: Option<String>,

    /// Log format. Overrides the config file.
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh ticket
    Ticket,
    /// Encrypt a file into a .encrypted sidecar and print its ticket
    Enc(EncArgs),
    /// Decrypt a .encrypted sidecar
    Dec(DecArgs),
    /// List a user's encryption history
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct EncArgs {
    /// Input file
    #[arg(short = 'i', long = "in")]
    input: PathBuf,

    /// Output sidecar. If omitted, ".encrypted" is appended.
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    #[arg(short = 'a', long, value_enum, default_value_t = AlgChoice::Gcm)]
    alg: AlgChoice,

    /// MIME type recorded in the sidecar and history
    #[arg(long, default_value = "application/octet-stream")]
    file_type: String,

    /// Record the job in this user's history
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Overwrite output if it exists
    #[arg(short = 'f', long = "force")]
    force: bool,
}

#[derive(Args, Debug)]
struct DecArgs {
    /// Input sidecar (.encrypted JSON)
    #[arg(short = 'i', long = "in")]
    input: PathBuf,

    /// Output file (plaintext). If omitted, ".encrypted" is stripped or ".dec" is appended.
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    /// Algorithm the file was encrypted with
    #[arg(short = 'a', long, value_enum, default_value_t = AlgChoice::Gcm)]
    alg: AlgChoice,

    /// Read the ticket from a file instead of the interactive prompt
    #[arg(short = 't', long = "ticket-file")]
    ticket_file: Option<PathBuf>,

    /// Overwrite the output file if it already exists.
    #[arg(short = 'f', long = "force")]
    force: bool,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(short = 'u', long)]
    user: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AlgChoice {
    Gcm,
    Cbc,
}

impl From<AlgChoice> for Algorithm {
    fn from(v: AlgChoice) -> Self {
        match v {
            AlgChoice::Gcm => Algorithm::AesGcm,
            AlgChoice::Cbc => Algorithm::AesCbc,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.unwrap_or(if config.log.format == "json" {
        LogFormat::Json
    } else {
        LogFormat::Text
    });
    init_logging(&level, format);

    match cli.cmd {
        Command::Ticket => cmd_ticket(),
        Command::Enc(a) => cmd_enc(a, &config).await,
        Command::Dec(a) => cmd_dec(a, &config).await,
        Command::History(a) => cmd_history(a, &config),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries tickets and listings; logs go to stderr.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn read_ticket(ticket_file: &Option<PathBuf>) -> Result<Ticket> {
    let secret = if let Some(path) = ticket_file {
        let mut s = String::new();
        fs::File::open(path)?.read_to_string(&mut s)?;
        let secret = SecretString::new(s.trim().to_owned().into_boxed_str());
        s.zeroize();
        secret
    } else {
        let t = rpassword::prompt_password("Ticket: ")?;
        SecretString::new(t.into_boxed_str())
    };
    Ok(Ticket::parse(secret.expose_secret())?)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos:>3}% {msg}") {
        pb.set_style(style);
    }
    pb
}

fn render(pb: &ProgressBar, response: &Response) {
    match response {
        Response::Start { total_size } => pb.set_message(format!("{total_size} bytes")),
        Response::Progress {
            progress,
            current_chunk,
            total_chunks,
        } => {
            pb.set_position(progress.round() as u64);
            pb.set_message(format!("chunk {current_chunk}/{total_chunks}"));
        }
        Response::Complete { .. } | Response::Error { .. } => {}
    }
}

fn cmd_ticket() -> Result<()> {
    let ticket = Ticket::generate()?;
    println!("{}", ticket.as_str());
    Ok(())
}

async fn cmd_enc(a: EncArgs, config: &Config) -> Result<()> {
    let algorithm = Algorithm::from(a.alg);
    let out_path = a.output.clone().unwrap_or_else(|| default_sidecar_path(&a.input));
    if out_path.exists() && !a.force {
        anyhow::bail!("output exists; use --force to overwrite");
    }

    let file_data =
        fs::read(&a.input).with_context(|| format!("reading {}", a.input.display()))?;
    let file_size = file_data.len() as u64;
    let file_name = display_name(&a.input);
    let ticket = Ticket::generate()?;

    let mut worker = Worker::spawn(config.pipeline)?;
    let pb = progress_bar();
    let output = worker
        .run_job(
            Request::Encrypt {
                file_data,
                algorithm,
                ticket: ticket.as_str().to_owned(),
            },
            |r| render(&pb, r),
        )
        .await
        .with_context(|| "encryption failed")?;
    pb.finish_and_clear();
    worker.terminate();

    let JobOutput::Encrypted {
        encrypted_data,
        iv,
    } = output
    else {
        anyhow::bail!("worker returned a decryption result for an encryption job");
    };

    let record = EncryptionRecord::new(
        encrypted_data,
        iv,
        &file_name,
        &a.file_type,
        ticket,
        algorithm,
        file_size,
    );
    EncryptedSidecar::from_record(&record).write_atomic(&out_path, a.force)?;

    if let Some(user) = a.user.as_deref() {
        let session = Session::new(user)?;
        let mut store = HistoryStore::open(&config.history.path)?;
        store.append(&session, &record)?;
    }

    info!(id = %record.id(), algorithm = %algorithm, size = file_size, "file encrypted");
    eprintln!("Wrote {}", out_path.display());
    eprintln!("Algorithm: {algorithm}");
    println!("{}", record.ticket().as_str());
    Ok(())
}

async fn cmd_dec(a: DecArgs, config: &Config) -> Result<()> {
    let algorithm = Algorithm::from(a.alg);
    let sidecar = EncryptedSidecar::read(&a.input)
        .with_context(|| format!("reading sidecar {}", a.input.display()))?;

    let target = a
        .output
        .clone()
        .unwrap_or_else(|| default_decrypt_output_path(&a.input));
    if target.exists() && !a.force {
        anyhow::bail!("output exists; use --force to overwrite");
    }

    let ticket = read_ticket(&a.ticket_file)?;

    let mut worker = Worker::spawn(config.pipeline)?;
    let pb = progress_bar();
    let output = worker
        .run_job(
            Request::Decrypt {
                encrypted_data: sidecar.data,
                iv: sidecar.iv,
                ticket: ticket.as_str().to_owned(),
                algorithm,
            },
            |r| render(&pb, r),
        )
        .await
        .with_context(|| "decryption failed")?;
    pb.finish_and_clear();
    worker.terminate();

    let JobOutput::Decrypted { decrypted_data } = output else {
        anyhow::bail!("worker returned an encryption result for a decryption job");
    };
    write_all_atomic(&target, &decrypted_data, false, a.force)?;

    eprintln!("Wrote {} ({})", target.display(), sidecar.file_name);
    Ok(())
}

fn cmd_history(a: HistoryArgs, config: &Config) -> Result<()> {
    let session = Session::new(&a.user)?;
    let store = HistoryStore::open(&config.history.path)
        .with_context(|| format!("opening history {}", config.history.path.display()))?;
    for e in store.list(&session) {
        println!(
            "{}  {}  {}  {} bytes  {}  {}",
            e.created_at.to_rfc3339(),
            e.algorithm,
            e.file_name,
            e.file_size,
            e.id,
            e.ticket.as_str()
        );
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
