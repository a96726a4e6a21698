// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, Command, arg, command, value_parser};

fn output_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print as pretty JSON"))
        .arg(arg!(--jsonl "Print as JSON lines").conflicts_with("json"))
}

fn month_arg() -> Arg {
    arg!(--month <MONTH> "Billing month, YYYY-MM").required(true)
}

fn budget_fields(cmd: Command) -> Command {
    cmd.arg(arg!(--scope <SCOPE> "line | department | company").required(true))
        .arg(arg!(--entity <ENTITY> "Phone number or department name"))
        .arg(arg!(--amount <AMOUNT>).required(true))
        .arg(arg!(--currency <CCY> "EUR | USD | ALL"))
        .arg(arg!(--period <PERIOD> "monthly | quarterly | yearly"))
        .arg(arg!(--threshold <PERCENT> "Alert threshold, 1-100 (default 80)"))
        .arg(arg!(--start <DATE> "Start date, YYYY-MM-DD (default today)"))
        .arg(arg!(--end <DATE> "Optional end date, YYYY-MM-DD"))
}

pub fn build_cli() -> Command {
    command!()
        .name("costdesk")
        .about("Telecom budgets, cost breakdowns and threshold alerts")
        .arg(arg!(--db <PATH> "SQLite database file (overrides COSTDESK_DB)").global(true))
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("serve")
                .about("Run the REST API")
                .arg(arg!(--addr <ADDR> "Listen address (overrides COSTDESK_ADDR)")),
        )
        .subcommand(
            Command::new("department")
                .about("Manage departments")
                .subcommand(Command::new("add").arg(arg!(--name <NAME>).required(true)))
                .subcommand(output_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("line")
                .about("Manage phone lines")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--phone <PHONE>).required(true))
                        .arg(arg!(--"assigned-to" <NAME>).required(true))
                        .arg(arg!(--department <NAME>)),
                )
                .subcommand(output_flags(Command::new("list")))
                .subcommand(
                    Command::new("deactivate").arg(arg!(--phone <PHONE>).required(true)),
                ),
        )
        .subcommand(
            Command::new("usage")
                .about("Record raw billing usage")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--phone <PHONE>).required(true))
                        .arg(arg!(--date <DATE>).required(true))
                        .arg(arg!(--category <CATEGORY> "data | calls | sms | other").required(true))
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--currency <CCY>).default_value("EUR"))
                        .arg(arg!(--description <TEXT>)),
                )
                .subcommand(
                    Command::new("import")
                        .about("Import date,phone_number,category,amount,currency,description rows")
                        .arg(arg!(--path <CSV>).required(true)),
                )
                .subcommand(output_flags(
                    Command::new("list").arg(arg!(--month <MONTH> "Billing month, YYYY-MM")),
                )),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage budgets")
                .subcommand(budget_fields(Command::new("add")))
                .subcommand(budget_fields(
                    Command::new("edit").arg(arg!(<ID> "Budget id").id("id")),
                ))
                .subcommand(Command::new("rm").arg(arg!(<ID> "Budget id").id("id")))
                .subcommand(output_flags(Command::new("list")))
                .subcommand(output_flags(
                    Command::new("summary").arg(arg!(--date <DATE> "Evaluate as of this day")),
                )),
        )
        .subcommand(
            Command::new("cost")
                .about("Cost breakdowns")
                .subcommand(Command::new("generate").arg(month_arg()))
                .subcommand(output_flags(Command::new("category").arg(month_arg())))
                .subcommand(output_flags(Command::new("line").arg(month_arg())))
                .subcommand(output_flags(Command::new("department").arg(month_arg())))
                .subcommand(output_flags(
                    Command::new("trends").arg(
                        arg!(--months <N> "Number of periods, 1-60")
                            .value_parser(value_parser!(u32))
                            .default_value("6"),
                    ),
                )),
        )
        .subcommand(output_flags(
            Command::new("threshold")
                .about("List budgets at or over their alert threshold")
                .arg(arg!(--date <DATE> "Evaluate as of this day")),
        ))
        .subcommand(
            Command::new("export")
                .about("Export a generated breakdown")
                .arg(arg!(--format <FORMAT> "csv | json").required(true))
                .arg(arg!(--"type" <TYPE> "category | line | department").required(true))
                .arg(month_arg())
                .arg(arg!(--out <PATH> "Output file (default cost-<type>-<month>.<ext>)")),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(Command::new("set-base").arg(arg!(--currency <CCY>).required(true)))
                .subcommand(
                    Command::new("set")
                        .arg(arg!(--date <DATE>).required(true))
                        .arg(arg!(--quote <CCY>).required(true))
                        .arg(arg!(--rate <RATE> "1 base = RATE quote").required(true)),
                )
                .subcommand(
                    Command::new("fetch").arg(
                        arg!(--days <DAYS>)
                            .value_parser(value_parser!(i64))
                            .default_value("120"),
                    ),
                )
                .subcommand(output_flags(Command::new("list")))
                .subcommand(
                    Command::new("convert")
                        .arg(arg!(--date <DATE>).required(true))
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--from <CCY>).required(true))
                        .arg(arg!(--to <CCY>).required(true)),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Budget alerts and notifications")
                .subcommand(Command::new("check").arg(arg!(--date <DATE>)))
                .subcommand(output_flags(Command::new("list")))
                .subcommand(Command::new("read").arg(arg!(<ID>).id("id")))
                .subcommand(Command::new("read-all")),
        )
        .subcommand(
            Command::new("user")
                .about("Dashboard users")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--email <EMAIL>).required(true))
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--company <NAME>))
                        .arg(arg!(--password <PASSWORD> "8 to 72 characters").required(true)),
                )
                .subcommand(output_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("recommendation")
                .about("Curated savings suggestions")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--savings <AMOUNT>).required(true))
                        .arg(arg!(--details <JSON> "e.g. {\"type\":\"shared_data_plan\",...}").required(true)),
                )
                .subcommand(Command::new("import").arg(arg!(--path <JSON>).required(true)))
                .subcommand(output_flags(Command::new("list"))),
        )
        .subcommand(output_flags(
            Command::new("doctor").about("Check stored data for inconsistencies"),
        ))
}
