mod backend;
mod calendar;
mod cli;
mod db;
mod domains;
mod error;
mod fmt;
mod models;
mod normalize;
mod parsing;
mod permissions;
mod reports;
mod samples;
mod settings;
mod store;
mod upload;
mod validation;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{
    CalendarCommands, Cli, ClientsCommands, CollateralCommands, Commands, MarginCommands,
    ReconcileCommands, StatementsCommands, TradesCommands,
};
use domains::trades::ManualTrade;
use permissions::CapabilityMap;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let map = CapabilityMap::standard();
    let role = cli.role.as_deref();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            user,
            profile_role,
        } => cli::init::run(data_dir, user, profile_role),
        Commands::Whoami { check } => cli::whoami::run(&map, role, check.as_deref()),
        Commands::Import { domain, file } => cli::import::run(&map, role, &domain, &file),
        Commands::Preview { domain, file, rows } => cli::import::preview(&domain, &file, rows),
        Commands::Sample { domain, output, url } => cli::sample::run(&domain, output, url),
        Commands::Clients { command } => match command {
            ClientsCommands::Add { name, pan, address } => {
                cli::clients::add(&map, role, &name, &pan, &address)
            }
            ClientsCommands::Update {
                id,
                name,
                pan,
                address,
            } => cli::clients::update(&map, role, id, &name, &pan, &address),
            ClientsCommands::List => cli::clients::list(&map, role),
            ClientsCommands::Show { id } => cli::clients::show(&map, role, id),
        },
        Commands::Trades { command } => match command {
            TradesCommands::Add {
                client_code,
                trade_date,
                exchange,
                segment,
                security,
                side,
                quantity,
                price,
                order_id,
                trade_id,
            } => cli::trades::add(
                &map,
                role,
                ManualTrade {
                    client_code,
                    trade_date,
                    exchange,
                    segment,
                    security,
                    side,
                    quantity,
                    price,
                    order_id,
                    trade_id,
                },
            ),
            TradesCommands::List { client_code } => {
                cli::trades::list(&map, role, client_code.as_deref())
            }
        },
        Commands::Margin { command } => match command {
            MarginCommands::Add {
                available,
                used,
                date,
            } => cli::margin::add(&map, role, &available, &used, &date),
            MarginCommands::List => cli::margin::list(&map, role),
        },
        Commands::Collateral { command } => match command {
            CollateralCommands::List => cli::margin::collateral(&map, role),
        },
        Commands::Statements { command } => match command {
            StatementsCommands::List { run } => cli::reconcile::statements(&map, role, run),
        },
        Commands::Reconcile { command } => match command {
            ReconcileCommands::Runs => cli::reconcile::runs(&map, role),
        },
        Commands::Calendar { command } => match command {
            CalendarCommands::Add {
                title,
                due,
                category,
                description,
            } => cli::calendar::add(&map, role, &title, &description, &due, &category),
            CalendarCommands::List => cli::calendar::list(&map, role),
            CalendarCommands::Update { id, status } => cli::calendar::update(&map, role, id, &status),
        },
        Commands::Report { template, output } => {
            cli::report::run(&map, role, template.as_deref(), output)
        }
        Commands::Dashboard => cli::dashboard::run(&map, role),
        Commands::Audit { limit } => cli::audit::run(&map, role, limit),
        Commands::Status => cli::status::run(),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "compliance-desk",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
