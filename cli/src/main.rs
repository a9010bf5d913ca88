use clap::{Parser, Subcommand};
use sonde_core::config::SondeConfig;
use sonde_core::endpoint::{format_reputation_dump, is_valid_host, PeerEndpoint, ProcessEndpoint, ReputationEntry};
use sonde_core::network::Network;
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Parser)]
#[command(name = "sonde")]
#[command(about = "Sonde - Decentralized Probe-Consensus Reputation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a honest-population simulation")]
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        peers: Option<usize>,
        #[arg(short, long)]
        rounds: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long)]
        miss_rate: Option<f64>,
        #[arg(long)]
        matrix: bool,
        #[arg(long)]
        dump: bool,
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        verbose: bool,
    },
    #[command(about = "Inject a colluding cluster and measure isolation")]
    Attack {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "10")]
        honest: usize,
        #[arg(long, default_value = "2")]
        evil: usize,
        #[arg(short, long, default_value = "500")]
        warmup: usize,
        #[arg(short, long)]
        rounds: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long)]
        verbose: bool,
    },
    #[command(about = "Degrade healthy peers mid-run and watch recovery")]
    Churn {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        peers: Option<usize>,
        #[arg(long, default_value = "2")]
        degrade: usize,
        #[arg(short, long, default_value = "100")]
        warmup: usize,
        #[arg(short, long)]
        rounds: Option<usize>,
        #[arg(long, default_value = "10")]
        window: usize,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long)]
        verbose: bool,
    },
    #[command(about = "Order a live peer process to probe a host")]
    Probe {
        host: String,
        #[arg(long)]
        peer_command: String,
    },
    #[command(about = "Generate default configuration")]
    Config {
        #[arg(short, long, default_value = "sonde.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Simulate { verbose, .. }
        | Commands::Attack { verbose, .. }
        | Commands::Churn { verbose, .. } => *verbose,
        _ => false,
    };
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Simulate {
            config,
            peers,
            rounds,
            seed,
            miss_rate,
            matrix,
            dump,
            json,
            ..
        } => handle_simulate(config, peers, rounds, seed, miss_rate, matrix, dump, json).await,
        Commands::Attack {
            config,
            honest,
            evil,
            warmup,
            rounds,
            seed,
            ..
        } => handle_attack(config, honest, evil, warmup, rounds, seed).await,
        Commands::Churn {
            config,
            peers,
            degrade,
            warmup,
            rounds,
            window,
            seed,
            ..
        } => handle_churn(config, peers, degrade, warmup, rounds, window, seed).await,
        Commands::Probe { host, peer_command } => handle_probe(&host, &peer_command).await,
        Commands::Config { output } => handle_config(&output),
    }
}

fn load_config(path: Option<&PathBuf>) -> Option<SondeConfig> {
    match path {
        Some(path) => match SondeConfig::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                println!("Error loading config: {}", e);
                None
            }
        },
        None => Some(SondeConfig::default()),
    }
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(rand::random);
    println!("Seed: {}", seed);
    seed
}

fn wire_dump(network: &Network, peer_id: &str) -> String {
    let entries: Vec<ReputationEntry> = network
        .peer(peer_id)
        .map(|peer| {
            peer.ledger
                .iter()
                .map(|(subject, record)| ReputationEntry {
                    address: subject.clone(),
                    probe_trust: record.probe_score(),
                    rec_trust: record.rec_score(),
                })
                .collect()
        })
        .unwrap_or_default();
    format_reputation_dump(&entries)
}

#[allow(clippy::too_many_arguments)]
async fn handle_simulate(
    config: Option<PathBuf>,
    peers: Option<usize>,
    rounds: Option<usize>,
    seed: Option<u64>,
    miss_rate: Option<f64>,
    matrix: bool,
    dump: bool,
    json: bool,
) {
    let Some(mut config) = load_config(config.as_ref()) else {
        return;
    };
    if let Some(peers) = peers {
        config.simulation.peers = peers;
    }
    if let Some(rounds) = rounds {
        config.simulation.rounds = rounds;
    }
    if let Some(seed) = seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(miss_rate) = miss_rate {
        config.simulation.miss_rate = miss_rate;
    }
    if let Err(e) = config.validate() {
        println!("Invalid configuration: {}", e);
        return;
    }

    let seed = resolve_seed(config.simulation.seed);
    println!(
        "Simulating {} peers for {} rounds...\n",
        config.simulation.peers, config.simulation.rounds
    );

    let mut network = Network::seeded(config.simulation.peers, config.protocol.clone(), seed);
    if config.simulation.miss_rate > 0.0 {
        for id in network.peer_ids() {
            network.set_miss_rate(&id, config.simulation.miss_rate);
        }
    }
    if config.simulation.evil_peers > 0 {
        let cluster = network.add_evil_cluster(config.simulation.evil_peers);
        println!("Injected colluding cluster: {}", cluster.join(", "));
    }

    network.run(config.simulation.rounds);
    tracing::info!("simulation finished");

    let report = network.report();
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => println!("Error rendering report: {}", e),
        }
    } else {
        println!("{}", report);
    }

    if matrix {
        println!("\n{}", network.reputation_matrix(&network.peer_ids()));
    }

    if dump {
        println!();
        for id in network.peer_ids() {
            println!("{}: {}", id, wire_dump(&network, &id));
        }
    }
}

async fn handle_attack(
    config: Option<PathBuf>,
    honest: usize,
    evil: usize,
    warmup: usize,
    rounds: Option<usize>,
    seed: Option<u64>,
) {
    let Some(config) = load_config(config.as_ref()) else {
        return;
    };
    let rounds = rounds.unwrap_or(config.simulation.rounds);
    let seed = resolve_seed(seed.or(config.simulation.seed));

    println!(
        "{} honest peers, {} colluding peers, {} warmup rounds...\n",
        honest, evil, warmup
    );

    let mut network = Network::seeded(honest, config.protocol.clone(), seed);
    let cluster = network.add_evil_cluster(evil);

    network.run(warmup);

    let mut subjects = vec!["peer-0".to_string()];
    subjects.extend(cluster.iter().cloned());
    println!("{}\n", network.reputation_matrix(&subjects));

    println!("Measurements start: {} honest-only rounds\n", rounds);
    network.reset_stats();
    for _ in 0..rounds {
        for index in 0..honest {
            network.ping_peer(index);
        }
    }

    println!("{}\n", network.report());
    println!("{}", network.reputation_matrix(&subjects));
}

#[allow(clippy::too_many_arguments)]
async fn handle_churn(
    config: Option<PathBuf>,
    peers: Option<usize>,
    degrade: usize,
    warmup: usize,
    rounds: Option<usize>,
    window: usize,
    seed: Option<u64>,
) {
    let Some(config) = load_config(config.as_ref()) else {
        return;
    };
    let peers = peers.unwrap_or(config.simulation.peers);
    let rounds = rounds.unwrap_or(config.simulation.rounds);
    let seed = resolve_seed(seed.or(config.simulation.seed));

    if degrade > peers {
        println!("Cannot degrade {} of {} peers", degrade, peers);
        return;
    }

    let mut network = Network::seeded(peers, config.protocol.clone(), seed);
    network.run(warmup);
    println!("{}\n", network.report());

    let degraded: Vec<String> = network
        .peer_ids()
        .into_iter()
        .skip(peers - degrade)
        .collect();
    for id in &degraded {
        network.set_miss_rate(id, 1.0);
    }
    println!("Degraded: {}\n", degraded.join(", "));

    let mut remaining = rounds;
    while remaining > 0 {
        let step = window.min(remaining);
        network.run(step);
        remaining -= step;

        println!("{}\n", network.report());
        network.reset_stats();
    }

    println!("{}", network.reputation_matrix(&degraded));
}

async fn handle_probe(host: &str, peer_command: &str) {
    if !is_valid_host(host) {
        println!("Bad host format: {}", host);
        return;
    }

    let mut parts = peer_command.split_whitespace();
    let Some(program) = parts.next() else {
        println!("Empty peer command");
        return;
    };
    let mut command = Command::new(program);
    command.args(parts);

    match ProcessEndpoint::connect(command) {
        Ok(mut endpoint) => {
            if let Err(e) = endpoint.send_probe(host).await {
                println!("Probe order failed: {}", e);
                return;
            }
            match endpoint.reputations().await {
                Ok(entries) => {
                    println!("Peer reputation table after probe:");
                    for entry in entries {
                        println!(
                            "  {} probe={} rec={}",
                            entry.address, entry.probe_trust, entry.rec_trust
                        );
                    }
                }
                Err(e) => println!("Reputation query failed: {}", e),
            }
        }
        Err(e) => println!("Cannot drive peer process: {}", e),
    }
}

fn handle_config(output: &PathBuf) {
    let config = SondeConfig::default();

    match config.to_toml() {
        Ok(rendered) => match std::fs::write(output, rendered) {
            Ok(_) => println!("Default configuration written to {}", output.display()),
            Err(e) => println!("Error writing config: {}", e),
        },
        Err(e) => println!("Error rendering config: {}", e),
    }
}
