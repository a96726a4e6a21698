// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use costdesk::{api, cli, commands, config::Config, db};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("costdesk=info,tower_http=warn,hyper=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut config = Config::from_env()?;
    if let Some(path) = matches.get_one::<String>("db") {
        config.database_path = Some(PathBuf::from(path));
    }
    let path = match &config.database_path {
        Some(p) => p.clone(),
        None => db::default_db_path()?,
    };
    let mut conn = db::open_or_init(&path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("serve", sub)) => {
            if let Some(addr) = sub.get_one::<String>("addr") {
                config.server_address = addr
                    .parse()
                    .with_context(|| format!("Invalid listen address '{}'", addr))?;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(api::serve(config, conn))?;
        }
        Some(("department", sub)) => commands::lines::handle_department(&conn, sub)?,
        Some(("line", sub)) => commands::lines::handle(&conn, sub)?,
        Some(("usage", sub)) => commands::usage::handle(&mut conn, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&conn, sub)?,
        Some(("cost", sub)) => commands::costs::handle(&mut conn, sub)?,
        Some(("threshold", sub)) => commands::thresholds::handle(&conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("fx", sub)) => commands::fx::handle(&conn, sub)?,
        Some(("notify", sub)) => commands::notifications::handle(&conn, sub)?,
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("recommendation", sub)) => commands::recommendations::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
