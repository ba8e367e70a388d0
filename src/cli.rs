// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn req(name: &'static str, help: &'static str) -> Arg {
    opt(name, help).required(true)
}

fn months_arg() -> Arg {
    // Kept as a raw string: anything that is not a positive integer means 6.
    opt("months", "Lookback window in months (default 6)")
}

pub fn build_cli() -> Command {
    command!()
        .name("moneymanager")
        .about("Personal budgeting ledger with trend forecasts")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("signup")
                .about("Create a user and log in")
                .arg(req("username", "Username"))
                .arg(req("email", "Email address"))
                .arg(opt("password", "Password (read from stdin when omitted)"))
                .arg(opt("confirm", "Repeat the password (read from stdin when omitted)")),
        )
        .subcommand(
            Command::new("login")
                .about("Log in, ending any other session of this user")
                .arg(req("username", "Username"))
                .arg(opt("password", "Password (read from stdin when omitted)")),
        )
        .subcommand(Command::new("logout").about("End the current session"))
        .subcommand(Command::new("whoami").about("Show the logged-in user"))
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Account name"))
                        .arg(req("balance", "Opening balance")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(req("name", "Current account name"))
                        .arg(req("new-name", "New account name"))
                        .arg(req("balance", "Opening balance")),
                )
                .subcommand(Command::new("rm").arg(req("name", "Account name")))
                .subcommand(
                    Command::new("transfer")
                        .about("Move money between two accounts")
                        .arg(req("from", "Source account"))
                        .arg(req("to", "Destination account"))
                        .arg(req("amount", "Amount to move"))
                        .arg(req("date", "YYYY-MM-DD"))
                        .arg(opt("note", "Free text note")),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Category name"))
                        .arg(req("type", "income or expense")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(req("name", "Current category name"))
                        .arg(opt("type", "Current type, when the name is ambiguous"))
                        .arg(req("new-name", "New category name"))
                        .arg(req("new-type", "income or expense")),
                )
                .subcommand(
                    Command::new("rm")
                        .arg(req("name", "Category name"))
                        .arg(opt("type", "Type, when the name is ambiguous")),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Manage transactions")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .arg(req("date", "YYYY-MM-DD"))
                        .arg(req("account", "Account name"))
                        .arg(req("category", "Category name"))
                        .arg(req("type", "income or expense"))
                        .arg(req("amount", "Positive amount"))
                        .arg(opt("note", "Free text note")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(opt("q", "Search note or category name"))
                        .arg(opt("account", "Account name"))
                        .arg(opt("year", "YYYY"))
                        .arg(opt("month", "YYYY-MM"))
                        .arg(opt("limit", "Maximum rows").value_parser(value_parser!(usize))),
                ))
                .subcommand(
                    Command::new("edit")
                        .arg(req("id", "Transaction id").value_parser(value_parser!(i64)))
                        .arg(req("date", "YYYY-MM-DD"))
                        .arg(req("account", "Account name"))
                        .arg(req("category", "Category name"))
                        .arg(req("type", "income or expense"))
                        .arg(req("amount", "Positive amount"))
                        .arg(opt("note", "Free text note")),
                )
                .subcommand(
                    Command::new("rm")
                        .arg(req("id", "Transaction id").value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage monthly budgets")
                .subcommand_required(true)
                .subcommand(
                    Command::new("set")
                        .arg(req("month", "YYYY-MM or YYYY-MM-DD"))
                        .arg(req("category", "Expense category name"))
                        .arg(req("amount", "Positive amount")),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(opt("month", "YYYY-MM or YYYY-MM-DD")),
                ))
                .subcommand(
                    Command::new("edit")
                        .arg(req("id", "Budget id").value_parser(value_parser!(i64)))
                        .arg(req("month", "YYYY-MM or YYYY-MM-DD"))
                        .arg(req("category", "Expense category name"))
                        .arg(req("amount", "Positive amount")),
                )
                .subcommand(
                    Command::new("rm").arg(req("id", "Budget id").value_parser(value_parser!(i64))),
                )
                .subcommand(json_flags(
                    Command::new("report").arg(req("month", "YYYY-MM or YYYY-MM-DD")),
                )),
        )
        .subcommand(json_flags(
            Command::new("dashboard").about("This month at a glance"),
        ))
        .subcommand(json_flags(
            Command::new("analytics")
                .about("Spend/income trend forecast")
                .arg(months_arg()),
        ))
        .subcommand(
            Command::new("ask")
                .about("Ask the finance assistant about your numbers")
                .arg(Arg::new("message").required(true).num_args(1..))
                .arg(months_arg())
                .arg(
                    Arg::new("show-prompt")
                        .long("show-prompt")
                        .action(ArgAction::SetTrue)
                        .help("Print the prompt instead of calling the model"),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Display settings")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set-currency")
                        .arg(Arg::new("label").required(true).help("e.g. RM")),
                ),
        )
}
