// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use inver::{cli, commands, config, db, logging, migrate};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let settings = config::Settings::from_matches(&matches)?;
    logging::init(&settings.log_filter);

    let mut conn = db::open_at(&settings.db_path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!(
                "Database ready at {} (schema version {})",
                settings.db_path.display(),
                migrate::schema_version(&conn)?
            );
        }
        Some(("snapshot", sub)) => commands::snapshot::handle(&mut conn, sub)?,
        Some(("gains", sub)) => commands::gains::handle(&conn, sub)?,
        Some(("analysis", sub)) => commands::analysis::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
