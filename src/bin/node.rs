//! `node <port>` — starts one mesh participant (spec §6 CLI surface).

use clap::Parser;

use readcoin::config::{Config, NODE_PORTS};
use readcoin::keychain::Keychain;
use readcoin::node::Node;
use readcoin::wallet::Wallet;

/// Start a readcoin mesh node.
#[derive(Parser, Debug)]
#[command(name = "node", about = "Start a readcoin proof-of-work node")]
struct Args {
    /// Port to bind and mine under. Must be one of the static mesh ports.
    port: u16,

    /// Directory holding this node's and its peers' wallet PEM files.
    #[arg(long, default_value = "wallets")]
    wallet_dir: std::path::PathBuf,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if !NODE_PORTS.contains(&args.port) {
        eprintln!(
            "error: port {} is not one of the static mesh ports {:?}",
            args.port, NODE_PORTS
        );
        std::process::exit(1);
    }

    let config = match Config::from_env(args.port) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to resolve NODE_IP/HQ_IP from the environment: {e}");
            std::process::exit(1);
        }
    };

    let wallet = match Wallet::load_or_generate(&args.wallet_dir, args.port) {
        Ok(wallet) => wallet,
        Err(e) => {
            eprintln!("error: failed to load or generate this node's wallet: {e}");
            std::process::exit(1);
        }
    };

    // Every other mesh port must already have a wallet on disk (the trusted
    // directory's contract, spec §4.7); this node cannot validate their
    // transfers otherwise.
    for &port in NODE_PORTS.iter().filter(|&&p| p != args.port) {
        if let Err(e) = Wallet::load_or_generate(&args.wallet_dir, port) {
            eprintln!("error: failed to provision peer wallet for port {port}: {e}");
            std::process::exit(1);
        }
    }

    let keychain = match Keychain::load_mesh(&args.wallet_dir) {
        Ok(keychain) => keychain,
        Err(e) => {
            eprintln!("error: failed to load the mesh's wallet book: {e}");
            std::process::exit(1);
        }
    };

    log::info!(
        "starting node on port {} (address {})",
        args.port,
        hex::encode(wallet.address)
    );

    let mut node = match Node::new(config, wallet, keychain) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("error: failed to start node: {e}");
            std::process::exit(1);
        }
    };

    node.run();
}
