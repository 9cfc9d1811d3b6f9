use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use rpc_health_check::health::{FleetAggregator, NodeSnapshot, SnapshotOptions};
use rpc_health_check::observability::logging;
use rpc_health_check::rpc::{JsonRpcClient, TelemetryClient};

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Inspection CLI for the RPC health-check agent", long_about = None)]
struct Cli {
    /// Deadline for each RPC call, in seconds
    #[arg(long, default_value_t = 10, global = true)]
    rpc_timeout: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a running agent for its current answer
    Status {
        #[arg(short, long, default_value = "127.0.0.1:9999")]
        addr: String,
    },
    /// Load one node's snapshot and print it as JSON
    Snapshot {
        #[arg(short, long, default_value = "http://localhost:8899")]
        rpc: String,

        /// Also load confirmed blocks for the previous and current epoch
        #[arg(long)]
        blocks: bool,
    },
    /// Poll several nodes once and print one CSV row per usable node
    Fleet {
        #[arg(required = true)]
        rpc: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    let rpc_timeout = Duration::from_secs(cli.rpc_timeout);

    match cli.command {
        Commands::Status { addr } => {
            let mut stream = TcpStream::connect(&addr).await?;
            let mut line = String::new();
            stream.read_to_string(&mut line).await?;
            println!("{}", line.trim_end());
        }
        Commands::Snapshot { rpc, blocks } => {
            let client = JsonRpcClient::new(rpc);
            let options = SnapshotOptions {
                rpc_timeout,
                load_ledger: true,
                load_blocks: blocks,
                load_meta: true,
            };
            let snapshot = NodeSnapshot::load(&client, &options).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            if snapshot.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Fleet { rpc } => {
            let clients = rpc
                .into_iter()
                .map(|url| Arc::new(JsonRpcClient::new(url)) as Arc<dyn TelemetryClient>)
                .collect();
            let aggregator = FleetAggregator::new(
                clients,
                SnapshotOptions {
                    rpc_timeout,
                    load_ledger: true,
                    load_blocks: true,
                    load_meta: false,
                },
            );

            if let Err(e) = aggregator.poll().await {
                eprintln!("error: {}", e);
            }

            let fleet = aggregator.fleet();
            if fleet.is_empty() {
                return Err("couldn't load any states".into());
            }

            if let Some(schedule) = fleet.snapshots()[0].schedule {
                if let Some(epoch) = fleet.snapshots()[0].epoch.map(|e| e.epoch) {
                    for e in [epoch.saturating_sub(1), epoch] {
                        eprintln!(
                            "epoch {} first slot {} last slot {}",
                            e,
                            schedule.first_slot_in_epoch(e),
                            schedule.last_slot_in_epoch(e)
                        );
                    }
                }
            }

            println!("id,rpcNode,minSlot,curSlot,maxRetransmitSlot,slotsStored,prevEpochBlocks,curEpochBlocks");
            for (id, s) in fleet.snapshots().iter().enumerate() {
                println!(
                    "{},{},{},{},{},{},{},{}",
                    id,
                    s.node,
                    s.minimum_slot,
                    s.current_slot,
                    s.max_retransmit_slot,
                    s.current_slot.saturating_sub(s.minimum_slot),
                    s.prev_epoch_block_count(),
                    s.cur_epoch_block_count()
                );
            }
        }
    }

    Ok(())
}
