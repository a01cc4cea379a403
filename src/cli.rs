// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{DB_ENV, TENANT_ENV};
use clap::{Arg, ArgAction, ArgGroup, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn days_arg(default: &'static str) -> Arg {
    Arg::new("days")
        .long("days")
        .value_parser(value_parser!(u32))
        .default_value(default)
        .help("How many days back to include")
}

fn holdings_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("file")
            .long("file")
            .required(true)
            .help("Portfolio export (CSV or JSON) with symbol, quantity, last_price, total_value"),
    )
    .arg(
        Arg::new("format")
            .long("format")
            .value_parser(["csv", "json"])
            .help("Input format; inferred from the file extension when omitted"),
    )
}

pub fn build_cli() -> Command {
    Command::new("inver")
        .about("Portfolio snapshot history and gain tracking")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env(DB_ENV)
                .help("Path to the SQLite database"),
        )
        .arg(
            Arg::new("tenant")
                .long("tenant")
                .global(true)
                .env(TENANT_ENV)
                .help("Account the command reads or writes"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Log progress to stderr (-vv for debug)"),
        )
        .subcommand(Command::new("init").about("Create or upgrade the database"))
        .subcommand(
            Command::new("snapshot")
                .about("Save and inspect daily valuation snapshots")
                .subcommand(
                    holdings_args(
                        Command::new("save").about("Save today's snapshot from a portfolio export"),
                    )
                    .arg(
                        Arg::new("total")
                            .long("total")
                            .help("Aggregate portfolio value (defaults to the sum of holdings)"),
                    )
                    .arg(
                        Arg::new("invested")
                            .long("invested")
                            .help("Amount invested to date"),
                    ),
                )
                .subcommand(json_flags(
                    Command::new("history")
                        .about("Portfolio value history")
                        .arg(days_arg("30")),
                ))
                .subcommand(json_flags(
                    Command::new("asset-history")
                        .about("Value history of one holding")
                        .arg(Arg::new("symbol").long("symbol").required(true))
                        .arg(days_arg("30")),
                )),
        )
        .subcommand(
            Command::new("gains")
                .about("Daily, weekly and monthly gains")
                .subcommand(json_flags(
                    Command::new("portfolio")
                        .about("Gains of the whole portfolio against its history")
                        .arg(
                            Arg::new("value")
                                .long("value")
                                .required(true)
                                .help("Current portfolio value"),
                        ),
                ))
                .subcommand(json_flags(holdings_args(
                    Command::new("assets").about("Gains of each holding in a portfolio export"),
                ))),
        )
        .subcommand(
            Command::new("analysis")
                .about("Record and review AI advisory responses")
                .subcommand(
                    Command::new("add")
                        .about("Record an advisory response")
                        .arg(Arg::new("model").long("model").required(true))
                        .arg(Arg::new("investment").long("investment").required(true))
                        .arg(
                            Arg::new("portfolio-value")
                                .long("portfolio-value")
                                .required(true),
                        )
                        .arg(Arg::new("text").long("text"))
                        .arg(
                            Arg::new("file")
                                .long("file")
                                .help("Read the response text from a file"),
                        )
                        .group(
                            ArgGroup::new("response")
                                .args(["text", "file"])
                                .required(true),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list").about("Most recent analyses first").arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(value_parser!(u32))
                            .default_value("10"),
                    ),
                )),
        )
        .subcommand(json_flags(
            Command::new("doctor").about("Check schema version and snapshot consistency"),
        ))
}
