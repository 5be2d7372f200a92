use alloy::primitives::Address;
use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, LevelFilter};
use std::path::PathBuf;

use loyalty_deployer::chain::NetworkClient;
use loyalty_deployer::config::Config;
use loyalty_deployer::scripts::{factory, membership, ScriptContext};
use loyalty_deployer::tasks;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Config file, defaults to config/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network name from the config, defaults to `default_network`
    #[arg(long)]
    network: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy FactoryERC1155 and create the loyalty token through it
    DeployFactory,
    /// Deploy MembershipToken
    DeployMembership {
        /// Also register the retailer and mint its tokens
        #[arg(long)]
        with_setup: bool,
    },
    /// Verify an already deployed contract on the block explorer
    Verify {
        #[arg(long)]
        address: Address,
        #[arg(long)]
        contract: String,
    },
    /// Print the current block number
    BlockNumber,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level.to_string())).init();

    match run(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    config.validate()?;

    let network = args
        .network
        .unwrap_or_else(|| config.default_network.clone());
    info!("Using network {}", network);

    match args.command {
        Command::DeployFactory => {
            let mut ctx = ScriptContext::connect(config, &network).await?;
            factory::run(&mut ctx).await
        }
        Command::DeployMembership { with_setup } => {
            let mut ctx = ScriptContext::connect(config, &network).await?;
            membership::run(&mut ctx, with_setup).await
        }
        Command::Verify { address, contract } => {
            let ctx = ScriptContext::connect(config, &network).await?;
            let artifact = ctx.artifacts.load(&contract)?;
            ctx.verify(&artifact, address, &[]).await;
            Ok(())
        }
        Command::BlockNumber => {
            let client = NetworkClient::connect(&network, config.network(&network)?).await?;
            let block_number = tasks::block_number(&client).await?;
            println!("Current block number: {}", block_number);
            Ok(())
        }
    }
}
