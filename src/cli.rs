use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use marketplace_access::{RequestSpec, ServiceFamily};
use reqwest::Method;
use serde_json::Value;

pub fn build_cli() -> Command {
    Command::new("marketplace-access")
        .about("Rate-limited client for the marketplace seller API families")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .global(true)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("quotas").about("Print the effective per-family quota table"))
        .subcommand(
            Command::new("call")
                .about("Perform one call through the limiter and retry loop; prints the JSON body")
                .arg(
                    Arg::new("family")
                        .long("family")
                        .required(true)
                        .num_args(1)
                        .help("statistics, marketplace, content, feedbacks, analytics or ads"),
                )
                .arg(
                    Arg::new("method")
                        .long("method")
                        .num_args(1)
                        .default_value("GET"),
                )
                .arg(Arg::new("path").long("path").required(true).num_args(1))
                .arg(
                    Arg::new("query")
                        .long("query")
                        .num_args(1)
                        .action(ArgAction::Append)
                        .help("Query parameter as key=value; repeatable"),
                )
                .arg(
                    Arg::new("body")
                        .long("body")
                        .num_args(1)
                        .help("JSON request body"),
                ),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Respect explicit level, else default to info, allow env override via RUST_LOG
    if let Some(lvl) = level {
        std::env::set_var("RUST_LOG", lvl);
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Turns the `call` subcommand's arguments into a request.
pub fn call_spec(m: &ArgMatches) -> anyhow::Result<RequestSpec> {
    let family: ServiceFamily = m
        .get_one::<String>("family")
        .ok_or_else(|| anyhow!("--family is required"))?
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let method_raw = m
        .get_one::<String>("method")
        .map(String::as_str)
        .unwrap_or("GET");
    let method = Method::from_bytes(method_raw.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {}", method_raw))?;
    let path = m
        .get_one::<String>("path")
        .ok_or_else(|| anyhow!("--path is required"))?;
    let path = if path.starts_with('/') {
        path.clone()
    } else {
        format!("/{}", path)
    };

    let mut spec = RequestSpec::new(family, method, path);
    for pair in m.get_many::<String>("query").into_iter().flatten() {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("query parameter {:?} is not key=value", pair))?;
        spec = spec.query(k, v);
    }
    if let Some(raw) = m.get_one::<String>("body") {
        let body: Value = serde_json::from_str(raw).context("--body is not valid JSON")?;
        spec = spec.json(body);
    }
    Ok(spec)
}
