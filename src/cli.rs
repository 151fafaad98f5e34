// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{command, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    command!()
        .about("Spendwatch: multi-currency expense tracking with recurring charges and budget alerts")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("user")
                .about("Manage users")
                .subcommand(
                    Command::new("add")
                        .about("Add a user")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("email").long("email"))
                        .arg(
                            Arg::new("base")
                                .long("base")
                                .default_value("USD")
                                .help("Base currency for budgets and totals"),
                        ),
                )
                .subcommand(Command::new("list").about("List users"))
                .subcommand(
                    Command::new("set-base")
                        .about("Change a user's base currency")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("currency").long("currency").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage spending categories")
                .subcommand(
                    Command::new("add")
                        .about("Add a category")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("list")
                        .about("List a user's categories")
                        .arg(Arg::new("user").long("user").required(true)),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Remove a category")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("expense")
                .about("Record and list expenses")
                .subcommand(
                    Command::new("add")
                        .about("Record an expense (converted to base currency at write time)")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("desc").long("desc")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List a user's expenses")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("month").long("month").help("YYYY-MM filter")),
                )),
        )
        .subcommand(
            Command::new("recurring")
                .about("Manage recurring charge templates")
                .subcommand(
                    Command::new("add")
                        .about("Add a recurring charge")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("frequency")
                                .long("frequency")
                                .required(true)
                                .help("weekly or monthly"),
                        )
                        .arg(Arg::new("start").long("start").required(true).help("YYYY-MM-DD"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("desc").long("desc")),
                )
                .subcommand(
                    Command::new("list")
                        .about("List a user's recurring charges")
                        .arg(Arg::new("user").long("user").required(true)),
                )
                .subcommand(
                    Command::new("deactivate")
                        .about("Deactivate a recurring charge (the engine ignores it permanently)")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage monthly category budgets")
                .subcommand(
                    Command::new("set")
                        .about("Set (or replace) a budget ceiling")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("month").long("month").required(true).help("YYYY-MM"))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(
                    Command::new("list")
                        .about("List a user's budgets")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("month").long("month").help("YYYY-MM filter")),
                )
                .subcommand(json_flags(
                    Command::new("report")
                        .about("Budget vs actual with severity tiers")
                        .arg(Arg::new("user").long("user").required(true))
                        .arg(Arg::new("month").long("month").required(true).help("YYYY-MM")),
                )),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(
                    Command::new("rate")
                        .about("Resolve a rate (cache first, live fetch on miss)")
                        .arg(Arg::new("base").long("base").required(true))
                        .arg(Arg::new("target").long("target").required(true)),
                )
                .subcommand(
                    Command::new("convert")
                        .about("Convert an amount between currencies")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )
                .subcommand(Command::new("list").about("Show cached rates")),
        )
        .subcommand(json_flags(
            Command::new("run")
                .about("Run one engine pass: generate due recurring charges, evaluate budgets, dispatch alerts")
                .arg(
                    Arg::new("as-of")
                        .long("as-of")
                        .help("Pass date (YYYY-MM-DD); defaults to today"),
                ),
        ))
        .subcommand(
            Command::new("config")
                .about("Engine configuration")
                .subcommand(Command::new("show").about("Show effective config"))
                .subcommand(
                    Command::new("set")
                        .about("Set config values")
                        .arg(Arg::new("warning").long("warning").help("Warning threshold percent"))
                        .arg(Arg::new("alert").long("alert").help("Alert threshold percent"))
                        .arg(
                            Arg::new("cache-hours")
                                .long("cache-hours")
                                .help("Exchange-rate cache freshness window in hours"),
                        )
                        .arg(
                            Arg::new("notifications")
                                .long("notifications")
                                .help("on or off"),
                        ),
                ),
        )
        .subcommand(Command::new("doctor").about("Check data health"))
}
