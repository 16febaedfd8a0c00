mod cli;

use anyhow::Context;
use marketplace_access::{ApiClient, Config};
use serde_json::Value;

#[tokio::main(flavor = "current_thread")] // one call per invocation
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("marketplace-access {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env()?;
    match matches.subcommand() {
        Some(("quotas", _)) => {
            for (family, quota) in cfg.quotas() {
                println!("{:<12} {:<10} {}", family, quota.to_string(), cfg.family(family).base_url);
            }
        }
        Some(("call", sub)) => {
            let spec = cli::call_spec(sub)?;
            let client = ApiClient::from_config(&cfg).context("building HTTP client")?;
            let value: Value = match client.perform(&spec).await {
                Ok(raw) if raw.body.trim().is_empty() => Value::Null,
                Ok(raw) => marketplace_access::http::decode_json(&raw)?,
                Err(e) => {
                    eprintln!("{}", serde_json::to_string(&e)?);
                    return Err(e.into());
                }
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
