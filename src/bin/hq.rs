//! `hq` — the headquarters injector: reads hex-encoded payloads from stdin
//! and broadcasts each decoded payload to every node address (spec C9,
//! §4.9, §6). Exposes no other surface; grounded in the original
//! implementation's `hq.py`.

use std::io::{self, BufRead, Write};
use std::net::UdpSocket;

use clap::Parser;

use readcoin::config::Config;

/// Broadcast raw hex-encoded UDP payloads to every node in the mesh.
#[derive(Parser, Debug)]
#[command(name = "hq", about = "Inject raw UDP payloads into the node mesh")]
struct Args {}

fn main() {
    env_logger::init();
    let _ = Args::parse();

    let config = match Config::from_env(readcoin::config::HQ_PORT) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to resolve NODE_IP/HQ_IP from the environment: {e}");
            std::process::exit(1);
        }
    };

    let socket = match UdpSocket::bind(config.hq_addr()) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("error: failed to bind injector socket on {}: {e}", config.hq_addr());
            std::process::exit(1);
        }
    };

    log::info!("injector listening for hex payloads on stdin, broadcasting to {:?}", config.node_addrs());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        let _ = stdout.flush();

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line).unwrap_or(0);
        if bytes_read == 0 {
            log::info!("stdin closed, injector exiting cleanly");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let payload = match hex::decode(trimmed) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("not a valid hex string, skipping: {e}");
                continue;
            }
        };

        for addr in config.node_addrs() {
            if let Err(e) = socket.send_to(&payload, addr) {
                log::warn!("failed to send to {addr}: {e}");
            }
        }
    }
}
