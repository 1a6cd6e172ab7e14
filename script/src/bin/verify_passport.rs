#[path = "../utils.rs"]
#[allow(dead_code)]
mod utils;

use std::path::PathBuf;

use clap::Parser;
use passport_voting_lib::sod::Sod;
use passport_voting_lib::{der, verify_sod_signature};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Passive authentication: verify a passport SOD against DG1 and a signer certificate"
)]
struct Args {
    /// SOD file (raw bytes, with or without the ICAO 0x77 envelope)
    #[arg(long)]
    sod: PathBuf,

    /// DG1 file (raw machine-readable-zone bytes)
    #[arg(long)]
    dg1: PathBuf,

    /// Document signer certificate, PEM
    #[arg(long)]
    cert: Option<PathBuf>,
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    utils::print_banner();

    let sod_bytes = match std::fs::read(&args.sod) {
        Ok(bytes) => bytes,
        Err(err) => {
            utils::print_error(&format!("reading {:?}: {err}", args.sod));
            std::process::exit(1);
        }
    };
    let dg1_bytes = match std::fs::read(&args.dg1) {
        Ok(bytes) => bytes,
        Err(err) => {
            utils::print_error(&format!("reading {:?}: {err}", args.dg1));
            std::process::exit(1);
        }
    };

    utils::print_step("parsing security object");
    let sod = match Sod::parse(&sod_bytes) {
        Ok(sod) => sod,
        Err(err) => {
            utils::print_error(&format!("{err}"));
            std::process::exit(1);
        }
    };
    utils::print_info("hash algorithm", &sod.hash_algorithm_oid);
    utils::print_info(
        "signature algorithm",
        &sod.signer.signature_algorithm_oid,
    );
    for (number, digest) in &sod.data_group_hashes {
        utils::print_info(
            &format!("DG{number}"),
            format!("{}…", hex::encode(&digest[..digest.len().min(8)])),
        );
    }
    utils::print_info(
        "embedded certificate",
        &sod.embedded_certificate.is_some().to_string(),
    );

    utils::print_step("checking DG1 integrity");
    match sod.dg1_matches(&dg1_bytes) {
        Ok(true) => utils::print_success("DG1 digest matches the signed manifest"),
        Ok(false) => {
            utils::print_error("DG1 digest does NOT match");
            std::process::exit(1);
        }
        Err(err) => {
            utils::print_error(&format!("{err}"));
            std::process::exit(1);
        }
    }

    let Some(cert_path) = args.cert else {
        utils::print_step("no certificate given, skipping signature check");
        return;
    };
    let cert_pem = match std::fs::read_to_string(&cert_path) {
        Ok(pem) => pem,
        Err(err) => {
            utils::print_error(&format!("reading {:?}: {err}", cert_path));
            std::process::exit(1);
        }
    };

    utils::print_step("verifying SOD signature");
    if verify_sod_signature(&sod_bytes, &cert_pem) {
        utils::print_success("signature verifies against the certificate");
    } else {
        // Fall back to the certificate embedded in the SOD, if any, so the
        // operator can tell a wrong-cert failure from a broken document.
        if let Some(embedded) = &sod.embedded_certificate {
            if der::public_key_from_cert_der(embedded)
                .map(|key| sod.verify_signature(&key))
                .unwrap_or(false)
            {
                utils::print_error(
                    "signature matches the embedded certificate but NOT the one provided",
                );
                std::process::exit(1);
            }
        }
        utils::print_error("signature does NOT verify");
        std::process::exit(1);
    }
}
