#[path = "../utils.rs"]
#[allow(dead_code)]
mod utils;

use std::path::PathBuf;

use clap::Parser;
use passport_voting_lib::config::AppConfig;
use passport_voting_lib::rpc::{fetch_all_proposals, EthRpcClient, VotingContract};
use passport_voting_lib::store::VoteStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "List on-chain voting proposals")]
struct Args {
    /// Configuration file
    #[arg(long, env = "PV_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Only show this proposal id
    #[arg(long)]
    id: Option<u64>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    utils::print_banner();

    let config = match AppConfig::from_path(&args.config) {
        Ok(config) => config,
        Err(err) => {
            utils::print_error(&format!("config: {err}"));
            std::process::exit(1);
        }
    };
    let store = VoteStore::open(&config.store_path).ok();

    let client = EthRpcClient::new(config.chain.rpc_url.clone());
    let voting = VotingContract::new(&client, config.chain.voting_contract.clone());

    let proposals = match args.id {
        Some(id) => match voting.proposal_info(id).await {
            Ok(info) => vec![info],
            Err(err) => {
                utils::print_error(&format!("proposal {id}: {err}"));
                std::process::exit(1);
            }
        },
        None => match fetch_all_proposals(&voting).await {
            Ok(proposals) => proposals,
            Err(err) => {
                utils::print_error(&format!("enumeration failed: {err}"));
                std::process::exit(1);
            }
        },
    };

    if proposals.is_empty() {
        utils::print_step("no proposals on this contract yet");
        return;
    }

    for info in &proposals {
        utils::print_divider();
        utils::print_step(&format!("proposal #{}: {}", info.id, info.title));
        utils::print_info("status", &format!("{:?}", info.status));
        utils::print_info("active", &info.is_active().to_string());
        utils::print_info(
            "window",
            &format!("{} +{}s", info.start_timestamp, info.duration),
        );
        utils::print_info("total votes", &info.total_votes().to_string());
        for option in &info.options {
            // One tally row per option.
            let tally: u64 = info
                .voting_results
                .get(option.index)
                .map(|row| row.iter().sum())
                .unwrap_or(0);
            utils::print_info(
                &format!("option {}", option.index),
                &format!("{} ({tally})", option.name),
            );
        }
        if !info.citizenship_whitelist.is_empty() {
            utils::print_info(
                "citizenship whitelist",
                &format!("{} entries", info.citizenship_whitelist.len()),
            );
        }
        if let Some(store) = &store {
            let selected = store.selected_option(info.id);
            if selected >= 0 {
                utils::print_info("your vote", &format!("option {selected}"));
            }
        }
    }
    utils::print_divider();
    utils::print_success(&format!("{} proposal(s)", proposals.len()));
}
