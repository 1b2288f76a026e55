// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;
mod session;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use examdesk_api::{Client, RequestContext};
use examdesk_app::{FilterPatch, ListKind, ListQuery, QuerySnapshot, reconcile};
use log::info;
use runtime::{ApiRuntime, PageLoader};
use session::BrowseSession;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    // Pure; needs neither config nor backend.
    if let Some(Command::Reconcile { query, patch }) = &options.command {
        print!("{}", reconcile_report(query, patch));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `examdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    logging::initialize(config.log_level());

    let client = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    let ctx = match config.api_token() {
        Some(token) => RequestContext::with_token(token),
        None => RequestContext::anonymous(),
    };

    if options.check_only {
        client.ping(&ctx)?;
        info!("backend at {} is reachable", client.base_url());
        println!("ok: {}", client.base_url());
        return Ok(());
    }

    let Some(command) = options.command else {
        print_help();
        return Ok(());
    };

    let mut runtime = ApiRuntime::new(client, ctx);
    match command {
        Command::List { kind, query } => {
            let view = runtime.load_page(kind, &ListQuery::from_snapshot(kind, &query))?;
            print!("{}", view.to_text());
        }
        Command::Browse { kind, query } => {
            let mut browse = BrowseSession::new(
                kind,
                query,
                config.page_settings()?,
                runtime,
                io::stdout(),
            );
            browse.run(session::spawn_stdin_reader())?;
        }
        Command::Get { kind, id } => print_json(&runtime.get(kind, id)?)?,
        Command::Create { kind, input } => {
            print_json(&runtime.create(kind, &read_input(&input)?)?)?;
        }
        Command::Update { kind, id, input } => {
            print_json(&runtime.update(kind, id, &read_input(&input)?)?)?;
        }
        Command::Delete { kind, id } => {
            runtime.delete(kind, id)?;
            println!("deleted {} {id}", kind.label());
        }
        Command::Reconcile { .. } => {}
    }
    Ok(())
}

fn reconcile_report(query: &QuerySnapshot, patch: &FilterPatch) -> String {
    let result = reconcile(query, patch);
    format!(
        "?{}\n{}\n",
        result.next,
        if result.changed { "changed" } else { "unchanged" }
    )
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read input file {}", path.display()))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("format response JSON")?
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List {
        kind: ListKind,
        query: QuerySnapshot,
    },
    Reconcile {
        query: QuerySnapshot,
        patch: FilterPatch,
    },
    Browse {
        kind: ListKind,
        query: QuerySnapshot,
    },
    Get {
        kind: ListKind,
        id: i64,
    },
    Create {
        kind: ListKind,
        input: PathBuf,
    },
    Update {
        kind: ListKind,
        id: i64,
        input: PathBuf,
    },
    Delete {
        kind: ListKind,
        id: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };
    let mut positional = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown if unknown.starts_with("--") => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            value => positional.push(value.to_owned()),
        }
    }

    if !positional.is_empty() {
        options.command = Some(parse_command(&positional)?);
    }
    Ok(options)
}

fn parse_command(args: &[String]) -> Result<Command> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("missing command; run with --help"))?;
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let command = match (name.as_str(), rest.as_slice()) {
        ("list", [entity]) => Command::List {
            kind: parse_kind(entity)?,
            query: QuerySnapshot::default(),
        },
        ("list", [entity, query]) => Command::List {
            kind: parse_kind(entity)?,
            query: QuerySnapshot::parse(query),
        },
        ("browse", [entity]) => Command::Browse {
            kind: parse_kind(entity)?,
            query: QuerySnapshot::default(),
        },
        ("browse", [entity, query]) => Command::Browse {
            kind: parse_kind(entity)?,
            query: QuerySnapshot::parse(query),
        },
        ("reconcile", [query, changes @ ..]) if !changes.is_empty() => Command::Reconcile {
            query: QuerySnapshot::parse(query),
            patch: FilterPatch::from_assignments(changes.iter())?,
        },
        ("get", [entity, id]) => Command::Get {
            kind: parse_kind(entity)?,
            id: parse_id(id)?,
        },
        ("create", [entity, input]) => Command::Create {
            kind: parse_kind(entity)?,
            input: PathBuf::from(*input),
        },
        ("update", [entity, id, input]) => Command::Update {
            kind: parse_kind(entity)?,
            id: parse_id(id)?,
            input: PathBuf::from(*input),
        },
        ("delete", [entity, id]) => Command::Delete {
            kind: parse_kind(entity)?,
            id: parse_id(id)?,
        },
        ("list" | "browse" | "reconcile" | "get" | "create" | "update" | "delete", _) => {
            bail!("wrong arguments for `{name}`; run with --help for usage")
        }
        (unknown, _) => bail!("unknown command {unknown:?}; run with --help to see commands"),
    };
    Ok(command)
}

fn parse_kind(value: &str) -> Result<ListKind> {
    ListKind::parse(value).ok_or_else(|| {
        let known: Vec<&str> = ListKind::ALL.iter().map(|kind| kind.label()).collect();
        anyhow!(
            "unknown entity {value:?}; expected one of {}",
            known.join(", ")
        )
    })
}

fn parse_id(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("id must be an integer, got {value:?}"))
}

fn print_help() {
    println!("examdesk");
    println!("  list <entity> [query]             Fetch one page, e.g. list users 'status=APPROVED&page=2'");
    println!("  browse <entity> [query]           Interactive list with debounced search");
    println!("  reconcile <query> <key=value>...  Print the reconciled query string");
    println!("  get <entity> <id>                 Fetch one record as JSON");
    println!("  create <entity> <json-file>       Create a record from a JSON file");
    println!("  update <entity> <id> <json-file>  Replace a record from a JSON file");
    println!("  delete <entity> <id>              Delete a record");
    println!();
    println!("  entities: users, tests, sections, topics, questions, payments, access");
    println!();
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and reach the backend");
    println!("  --help                   Show this help");
}
