#[macro_use]
extern crate tracing;

use std::env;
use std::process;

use clap::Parser;
use policyangel_cards::cli::{Cli, Sub};
use policyangel_cards::simulate::Simulation;
use policyangel_cards::utils::{config_path, version};
use policyangel_config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let directives =
        env::var("RUST_LOG").unwrap_or_else(|_| "policyangel_cards=debug,info".to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let _client = tracy_client::Client::start();

    info!("starting version {}", &version());

    let path = config_path(cli.config)?;

    match cli.subcommand {
        Sub::Validate => match path.load() {
            Ok(_) => info!("config is valid"),
            Err(err) => {
                error!("{err:?}");
                process::exit(1);
            }
        },
        Sub::Simulate {
            stack,
            cards,
            json,
            steps,
        } => {
            let config = match path.load() {
                Ok(config) => config,
                Err(err) => {
                    warn!("{err:?}");
                    warn!("using the default config");
                    Config::default()
                }
            };

            if !config.card_stacks.iter().any(|named| named.name == stack) {
                warn!("no card-stack {stack:?} in the config, using default settings");
            }

            let mut sim = Simulation::from_config(&config, &stack, cards);
            let frames = sim.run(&steps);

            if json {
                let output = serde_json::to_string_pretty(&frames)?;
                println!("{output}");
            } else {
                for frame in &frames {
                    println!("{frame}\n");
                }
            }
        }
    }

    Ok(())
}
