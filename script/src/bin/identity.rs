#[path = "../utils.rs"]
#[allow(dead_code)]
mod utils;

use std::path::PathBuf;

use clap::Parser;
use passport_voting_lib::config::AppConfig;
use passport_voting_lib::store::{Identity, VoteStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Create or show the local voting identity")]
struct Args {
    /// Configuration file
    #[arg(long, env = "PV_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Create an identity with this ISO 3166-1 alpha-3 citizenship code
    #[arg(long)]
    citizenship: Option<String>,

    /// Replace an existing identity
    #[arg(long)]
    force: bool,
}

fn main() {
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
    let mut store = match VoteStore::open(&config.store_path) {
        Ok(store) => store,
        Err(err) => {
            utils::print_error(&format!("store: {err}"));
            std::process::exit(1);
        }
    };

    if let Some(citizenship) = args.citizenship {
        if store.identity().is_some() && !args.force {
            utils::print_error("an identity already exists; pass --force to replace it");
            std::process::exit(1);
        }
        if citizenship.len() != 3 || !citizenship.chars().all(|c| c.is_ascii_alphabetic()) {
            utils::print_error("citizenship must be a three-letter ISO 3166-1 code");
            std::process::exit(1);
        }
        let created_at = chrono::Utc::now().timestamp() as u64;
        let identity = Identity::generate(&citizenship, created_at);
        if let Err(err) = store.set_identity(identity) {
            utils::print_error(&format!("saving identity: {err}"));
            std::process::exit(1);
        }
        utils::print_success("identity created");
    }

    match store.identity() {
        Some(identity) => {
            utils::print_info("nullifier", &identity.nullifier);
            utils::print_info("citizenship", &identity.citizenship);
            utils::print_info("created", &identity.created_at.to_string());
            utils::print_info("store", &store.path().display().to_string());
        }
        None => {
            utils::print_step("no identity yet; create one with --citizenship <CODE>");
        }
    }
}
