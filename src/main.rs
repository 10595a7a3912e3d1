mod config;
mod digest;
mod download;
mod fetch;
mod listing;
mod pipeline;

use crate::config::Config;
use crate::digest::DigestRecord;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::error::Error;
use std::io::{self, Write};
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    Command::new("repodigest")
        .about("Download the files of a repository and print their SHA-256 digests")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(Arg::new("api-base").long("api-base").value_name("URL"))
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("max-concurrent")
                .long("max-concurrent")
                .value_name("N")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(Arg::new("owner"))
        .arg(Arg::new("repo"))
}

fn apply_matches(config: &mut Config, m: &ArgMatches) {
    if let Some(api_base) = m.get_one::<String>("api-base") {
        config.api_base = api_base.clone();
    }
    if let Some(timeout) = m.get_one::<u64>("timeout").copied().and_then(NonZeroU64::new) {
        config.timeout_secs = timeout;
    }
    if let Some(limit) = m.get_one::<u64>("max-concurrent") {
        config.max_concurrent = NonZeroUsize::new(usize::try_from(*limit).unwrap_or(usize::MAX));
    }
    if let Some(owner) = m.get_one::<String>("owner") {
        config.owner = owner.clone();
    }
    if let Some(repo) = m.get_one::<String>("repo") {
        config.repo = repo.clone();
    }
}

fn print_records<W: Write>(mut out: W, records: &[DigestRecord], format: &str) -> io::Result<()> {
    if format == "json" {
        serde_json::to_writer_pretty(&mut out, records)?;
        writeln!(out)?;
    } else {
        for record in records {
            writeln!(out, "{}: {}", record.path.display(), record.hex_digest)?;
        }
    }
    out.flush()
}

async fn run(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(m.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    apply_matches(&mut config, m);

    log::debug!("Config: {:?}", config);

    let records = tokio::select! {
        records = pipeline::run(&config) => records?,
        Ok(()) = tokio::signal::ctrl_c() => return Err("interrupted".into()),
    };

    let format = m
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    print_records(io::stdout().lock(), &records, format)?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();
    let m = cli().get_matches();

    match run(&m).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut message = err.to_string();
            let mut source = err.source();
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
            log::error!("{}", message);
            eprintln!("repodigest: {}", message);
            ExitCode::FAILURE
        }
    }
}
