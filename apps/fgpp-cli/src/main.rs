//! fgpp - Fine-grained password policy report for Active Directory
//!
//! Binds to a domain controller, finds every user and group governed by a
//! Password Settings Object, and prints the PSOs with their decoded settings.

use clap::Parser;
use tracing::{info, warn};

use fgpp_cli::output::use_color;
use fgpp_cli::{logging, render_json, render_text, Cli, CliResult, ReportOptions};
use fgpp_connector_ldap::LdapSession;
use fgpp_core::discovery::{discover, DiscoveryOptions};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let color = use_color(cli.no_color);

    logging::init(cli.log_level(), color);

    match run(&cli, color).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print(color);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: &Cli, color: bool) -> CliResult<()> {
    let config = cli.to_config()?;
    info!(config = ?config.ldap, "Starting PSO discovery");

    let session = LdapSession::connect(&config.ldap).await?;
    info!(
        url = %session.url(),
        dc = session.dns_host_name().unwrap_or("-"),
        "Connected to domain controller"
    );
    let options = DiscoveryOptions {
        page_size: config.ldap.page_size,
    };
    let discovered = discover(&session, &options).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close LDAP session");
    }
    let model = discovered?;

    let report = if cli.json {
        render_json(&model)?
    } else {
        render_text(
            &model,
            &ReportOptions {
                color,
                include_unapplied: cli.include_unapplied,
            },
        )?
    };
    println!("{report}");
    Ok(())
}
