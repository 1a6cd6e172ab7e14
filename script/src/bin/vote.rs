#[path = "../utils.rs"]
#[allow(dead_code)]
mod utils;

use std::path::PathBuf;

use clap::Parser;
use passport_voting_lib::config::AppConfig;
use passport_voting_lib::prover::MockProver;
use passport_voting_lib::rpc::{EthRpcClient, VotingContract};
use passport_voting_lib::store::VoteStore;
use passport_voting_lib::vote::{VoteProgress, VoteSubmitter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cast an anonymous vote on a proposal")]
struct Args {
    /// Configuration file
    #[arg(long, env = "PV_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Proposal id to vote on
    #[arg(long)]
    proposal: u64,

    /// Selected option index; repeat for multichoice questions
    #[arg(long = "option", required = true)]
    options: Vec<usize>,
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

    let client = EthRpcClient::new(config.chain.rpc_url.clone());
    let voting = VotingContract::new(&client, config.chain.voting_contract.clone());

    utils::print_step(&format!("fetching proposal {}", args.proposal));
    let proposal = match voting.proposal_info(args.proposal).await {
        Ok(proposal) => proposal,
        Err(err) => {
            utils::print_error(&format!("proposal fetch failed: {err}"));
            std::process::exit(1);
        }
    };
    utils::print_info("title", &proposal.title);
    utils::print_info("status", &format!("{:?}", proposal.status));
    if !proposal.is_active() {
        utils::print_error("proposal is not accepting votes");
        std::process::exit(1);
    }

    let mut store = match VoteStore::open(&config.store_path) {
        Ok(store) => store,
        Err(err) => {
            utils::print_error(&format!("store: {err}"));
            std::process::exit(1);
        }
    };

    if let Some(identity) = store.identity() {
        if store.has_voted(&identity.nullifier, &proposal.voting_contract_address) {
            utils::print_warn("a vote from this identity is already recorded locally; the contract will reject a duplicate");
        }
    }

    // Mock proofs are only meaningful against the permissive dev verifier.
    let prover = MockProver;
    let mut submitter = VoteSubmitter::new(&config, &client, &prover, &mut store);

    let result = submitter
        .cast_vote(&proposal, &args.options, |progress| {
            let (step, label) = match progress {
                VoteProgress::BuildingInputs => (1, "building circuit inputs"),
                VoteProgress::GeneratingProof => (2, "generating proof (mock)"),
                VoteProgress::Submitting => (3, "submitting vote"),
                VoteProgress::Confirmed => (4, "confirmed"),
            };
            utils::print_step(&format!("[{step}/4] {label}"));
        })
        .await;

    match result {
        Ok(receipt) => {
            utils::print_success("vote submitted");
            utils::print_info("tx", &receipt.tx);
        }
        Err(failure) => {
            utils::print_error(&format!("{failure}"));
            std::process::exit(1);
        }
    }
}
