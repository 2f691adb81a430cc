//! CLI entry point for `mimeentity`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;

use mimeentity::{Address, Codec, Entity, Message};

#[derive(Parser)]
#[command(
    name = "mimeentity",
    version,
    about = "Decode the headers, addresses and bodies of a MIME message"
)]
struct Cli {
    /// Message file (.eml, or a single-message mbox)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Only show the part with this id (e.g. 1.2)
    #[arg(short, long, value_name = "ID")]
    part: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// What gets printed for one entity.
#[derive(Serialize)]
struct EntityReport {
    id: String,
    content_type: Option<String>,
    charset: Option<String>,
    transfer_encoding: Option<String>,
    filename: Option<String>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    from: Vec<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    body_size: usize,
    text: Option<String>,
}

impl EntityReport {
    fn from_entity(entity: &Entity<'_>) -> anyhow::Result<Self> {
        let body_size = entity.decoded_bytes()?.len();
        let is_text = entity
            .content_type()
            .is_some_and(|ct| ct.starts_with("text/"))
            && !entity.is_attachment();
        let text = if is_text {
            Some(entity.decoded()?)
        } else {
            None
        };
        Ok(Self {
            id: entity.id().to_string(),
            content_type: entity.content_type().map(str::to_string),
            charset: entity.charset().map(str::to_string),
            transfer_encoding: entity.transfer_encoding().map(str::to_string),
            filename: entity.filename(),
            subject: entity.header("subject"),
            date: entity.date(),
            from: entity.addresses("from"),
            to: entity.addresses("to"),
            cc: entity.addresses("cc"),
            body_size,
            text,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mimeentity::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    let codec = Codec::from_config(&config.decoding);
    cmd_show(&cli.file, codec, cli.part.as_deref(), cli.json)
}

/// Set up tracing with stderr output.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Decode a message file and print its entities.
fn cmd_show(
    path: &Path,
    codec: Codec,
    part: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let message = Message::open(path, codec)?;
    let entities: Vec<Entity<'_>> = match part {
        Some(id) => match message.entity(id) {
            Some(entity) => vec![entity],
            None => anyhow::bail!("No part with id {id} in {}", path.display()),
        },
        None => message.entities().collect(),
    };

    let reports = entities
        .iter()
        .map(|entity| EntityReport::from_entity(&entity.clone().parse()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(())
}

fn print_report(report: &EntityReport) {
    println!("── Part {} ──", report.id);
    println!(
        "  Type:       {}",
        report.content_type.as_deref().unwrap_or("-")
    );
    if let Some(charset) = &report.charset {
        println!("  Charset:    {charset}");
    }
    if let Some(te) = &report.transfer_encoding {
        println!("  Encoding:   {te}");
    }
    if let Some(name) = &report.filename {
        println!("  Filename:   {name}");
    }
    if let Some(subject) = &report.subject {
        println!("  Subject:    {subject}");
    }
    if let Some(date) = &report.date {
        println!("  Date:       {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    print_addresses("From", &report.from);
    print_addresses("To", &report.to);
    print_addresses("Cc", &report.cc);
    println!("  Body size:  {} bytes", report.body_size);
    if let Some(text) = &report.text {
        println!();
        for line in text.lines() {
            println!("    {line}");
        }
    }
    println!();
}

fn print_addresses(label: &str, addresses: &[Address]) {
    if addresses.is_empty() {
        return;
    }
    let joined: Vec<String> = addresses.iter().map(Address::to_string).collect();
    println!("  {:<11} {}", format!("{label}:"), joined.join(", "));
}
