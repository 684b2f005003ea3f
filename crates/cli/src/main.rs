//! Waitline CLI - join virtual lines and watch your place

mod rpc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rpc::RpcClient;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use waitline_core::application::{IdentityService, NotificationTracker, QueueStatus};
use waitline_core::domain::queue::DEFAULT_NOTIFY_THRESHOLD;
use waitline_core::domain::{DestinationId, LocalIdentity};
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::Notification;
use waitline_infra_device::FileIdentityCache;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";
const DEFAULT_IDENTITY_PATH: &str = "~/.waitline/identity.json";

#[derive(Parser)]
#[command(name = "waitline")]
#[command(about = "Waitline virtual queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, global = true, env = "WAITLINE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Where this device keeps its requester identity
    #[arg(long, global = true, env = "WAITLINE_IDENTITY_PATH", default_value = DEFAULT_IDENTITY_PATH)]
    identity_path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show this device's requester id and current selection
    Whoami,

    /// Register a destination (owner)
    Register {
        #[arg(long)]
        name: String,

        /// Must start with https://
        #[arg(long)]
        website: String,

        /// 10 digits
        #[arg(long)]
        phone: String,

        /// People admitted per batch
        #[arg(long)]
        entry_rate: u32,
    },

    /// Search destinations by name
    Find {
        /// Case-insensitive substring, empty lists everything
        #[arg(default_value = "")]
        query: String,
    },

    /// Choose a destination and party size for later commands
    Select {
        destination: String,

        #[arg(short, long, default_value = "1")]
        party_size: i64,
    },

    /// Join a line
    Join {
        /// Defaults to the selected destination
        #[arg(short, long)]
        destination: Option<String>,

        /// Defaults to the selected party size
        #[arg(short, long)]
        party_size: Option<i64>,
    },

    /// Leave a line
    Leave {
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Show your place in line
    Position {
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Poll your place in line and alert when you are near the front
    Watch {
        #[arg(short, long)]
        destination: Option<String>,

        /// Seconds between polls
        #[arg(short, long, default_value = "10")]
        interval: u64,

        /// Alert at or below this many people
        #[arg(short, long, default_value_t = DEFAULT_NOTIFY_THRESHOLD)]
        threshold: u64,
    },

    /// Admit the next batch (owner)
    Serve { destination: String },

    /// Rate a destination
    Feedback {
        #[arg(short, long)]
        destination: Option<String>,

        /// 1 to 5 stars
        #[arg(short, long)]
        rating: i64,

        #[arg(short, long, default_value = "")]
        comment: String,
    },

    /// Show system status
    Status,
}

#[derive(Deserialize, Tabled)]
struct DestinationRow {
    name: String,
    website: String,
    phone: String,
    #[tabled(rename = "entry rate")]
    entry_rate: u32,
    #[tabled(rename = "served today")]
    day_count: u64,
}

#[derive(Deserialize)]
struct FindResult {
    destinations: Vec<DestinationRow>,
}

#[derive(Deserialize, Tabled)]
struct PartyRow {
    requester: String,
    #[tabled(rename = "party size")]
    party_size: u32,
}

#[derive(Deserialize)]
struct ServeResult {
    destination: String,
    admitted: Vec<PartyRow>,
    people_admitted: u64,
    day_count: u64,
}

#[derive(Deserialize)]
struct JoinResult {
    destination: String,
    sequence: i64,
}

struct App {
    rpc: RpcClient,
    identity: IdentityService,
}

impl App {
    async fn identity(&self) -> Result<LocalIdentity> {
        self.identity
            .ensure_identity()
            .await
            .context("Failed to load local identity")
    }
}

/// Explicit destination, or the selected one
fn pick_destination(arg: Option<String>, identity: &LocalIdentity) -> Result<String> {
    arg.or_else(|| identity.selected_destination.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No destination selected. Pass --destination or run `waitline select`")
        })
}

fn print_status(status: &QueueStatus) {
    println!(
        "  {} {} ({} people ahead of you)",
        "Position:".bold(),
        status.position.to_string().cyan().bold(),
        status.people_ahead
    );
    println!(
        "  {} {} people in {} parties",
        "Waiting:".bold(),
        status.total_waiting,
        status.parties_waiting
    );
    if status.near_front {
        println!("  {}", "You are near the front. Head back now!".yellow().bold());
    }
}

async fn watch(
    app: &App,
    destination: String,
    interval: Duration,
    threshold: u64,
) -> Result<()> {
    let identity = app.identity().await?;
    let requester = identity.requester_id;
    let destination_id = DestinationId::from_name(&destination);
    let tracker = NotificationTracker::new(threshold);

    println!(
        "{}",
        format!("Watching your place at {} (Ctrl+C stops watching, you stay in line)", destination)
            .cyan()
            .bold()
    );

    let mut tick = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println!("Stopped watching. Your place in line is kept.");
                return Ok(());
            }
            _ = tick.tick() => {
                let status: Result<QueueStatus> = app
                    .rpc
                    .call(
                        "queue.position.v1",
                        json!({ "destination": destination, "requester": requester }),
                    )
                    .await;

                match status {
                    Ok(status) => {
                        println!(
                            "  position {} of {}",
                            status.position.to_string().bold(),
                            status.total_waiting
                        );
                        if tracker.observe(&destination_id, &requester, status.position) {
                            let alert = Notification::near_front(
                                destination_id.clone(),
                                requester.clone(),
                                status.position,
                            );
                            println!("\x07{} {}", alert.title.yellow().bold(), alert.body);
                        }
                    }
                    Err(e) if rpc::has_code(&e, rpc::code::NOT_QUEUED) => {
                        println!("{}", format!("You are no longer in line at {}", destination).green());
                        return Ok(());
                    }
                    Err(e) => eprintln!("  {} {:#}", "warning:".yellow(), e),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let identity_path = shellexpand::tilde(&cli.identity_path).into_owned();
    let app = App {
        rpc: RpcClient::new(cli.rpc_url),
        identity: IdentityService::new(
            Arc::new(FileIdentityCache::new(identity_path)),
            Arc::new(UuidProvider),
        ),
    };

    match cli.command {
        Commands::Whoami => {
            let identity = app.identity().await?;
            println!("  {} {}", "Requester:".bold(), identity.requester_id);
            match (&identity.selected_destination, identity.party_size) {
                (Some(destination), Some(size)) => {
                    println!("  {} {} (party of {})", "Selected:".bold(), destination, size.get())
                }
                _ => println!("  {} none", "Selected:".bold()),
            }
        }

        Commands::Register {
            name,
            website,
            phone,
            entry_rate,
        } => {
            let params = json!({
                "name": name,
                "website": website,
                "phone": phone,
                "entry_rate": entry_rate,
            });
            let row: DestinationRow = app.rpc.call("destination.register.v1", params).await?;

            println!("{}", "✓ Destination registered".green().bold());
            println!();
            println!("{}", Table::new(vec![row]));
        }

        Commands::Find { query } => {
            let result: FindResult = app
                .rpc
                .call("destination.find.v1", json!({ "query": query }))
                .await?;

            if result.destinations.is_empty() {
                println!("{}", "No destinations found".yellow());
            } else {
                println!("{}", Table::new(result.destinations));
            }
        }

        Commands::Select {
            destination,
            party_size,
        } => {
            let identity = app
                .identity
                .select_destination(&destination, party_size)
                .await?;
            println!(
                "{}",
                format!(
                    "✓ Selected {} for a party of {}",
                    destination,
                    identity.party_size.map_or(0, |s| s.get())
                )
                .green()
                .bold()
            );
        }

        Commands::Join {
            destination,
            party_size,
        } => {
            let identity = app.identity().await?;
            let destination = pick_destination(destination, &identity)?;
            let party_size = party_size
                .or_else(|| identity.party_size.map(|s| i64::from(s.get())))
                .unwrap_or(1);

            let joined: JoinResult = app
                .rpc
                .call(
                    "queue.join.v1",
                    json!({
                        "destination": destination,
                        "requester": identity.requester_id,
                        "party_size": party_size,
                    }),
                )
                .await?;
            app.identity
                .select_destination(&destination, party_size)
                .await?;

            println!(
                "{}",
                format!("✓ Joined the line at {} (ticket #{})", joined.destination, joined.sequence)
                    .green()
                    .bold()
            );

            let status: QueueStatus = app
                .rpc
                .call(
                    "queue.position.v1",
                    json!({ "destination": destination, "requester": identity.requester_id }),
                )
                .await?;
            print_status(&status);
        }

        Commands::Leave { destination } => {
            let identity = app.identity().await?;
            let destination = pick_destination(destination, &identity)?;

            let _: serde_json::Value = app
                .rpc
                .call(
                    "queue.leave.v1",
                    json!({ "destination": destination, "requester": identity.requester_id }),
                )
                .await?;

            let selected = identity
                .selected_destination
                .as_deref()
                .map(DestinationId::from_name);
            if selected == Some(DestinationId::from_name(&destination)) {
                app.identity.clear_selection().await?;
            }

            println!("{}", format!("✓ Left the line at {}", destination).green().bold());
            println!("  Tell us how it went: waitline feedback -d \"{}\" -r <1-5>", destination);
        }

        Commands::Position { destination } => {
            let identity = app.identity().await?;
            let destination = pick_destination(destination, &identity)?;

            let status: QueueStatus = app
                .rpc
                .call(
                    "queue.position.v1",
                    json!({ "destination": destination, "requester": identity.requester_id }),
                )
                .await?;
            println!("{}", format!("Your place at {}", destination).cyan().bold());
            print_status(&status);
        }

        Commands::Watch {
            destination,
            interval,
            threshold,
        } => {
            let identity = app.identity().await?;
            let destination = pick_destination(destination, &identity)?;
            watch(&app, destination, Duration::from_secs(interval.max(1)), threshold).await?;
        }

        Commands::Serve { destination } => {
            let served: ServeResult = app
                .rpc
                .call("destination.serve.v1", json!({ "destination": destination }))
                .await?;

            if served.admitted.is_empty() {
                println!("{}", format!("The line at {} is empty", served.destination).yellow());
            } else {
                println!(
                    "{}",
                    format!(
                        "✓ Admitted {} people at {}",
                        served.people_admitted, served.destination
                    )
                    .green()
                    .bold()
                );
                println!();
                println!("{}", Table::new(served.admitted));
            }
            println!("  {} {}", "Served today:".bold(), served.day_count);
        }

        Commands::Feedback {
            destination,
            rating,
            comment,
        } => {
            let identity = app.identity().await?;
            let destination = pick_destination(destination, &identity)?;

            let _: serde_json::Value = app
                .rpc
                .call(
                    "feedback.submit.v1",
                    json!({
                        "destination": destination,
                        "requester": identity.requester_id,
                        "rating": rating,
                        "comment": comment,
                    }),
                )
                .await?;
            println!("{}", "✓ Thanks for your feedback".green().bold());
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match app
                .rpc
                .call::<_, serde_json::Value>("admin.stats.v1", json!({}))
                .await
            {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), app.rpc.url());
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Destinations:".bold(), stats["destinations"]);
                    println!("  {} {}", "Active lines:".bold(), stats["active_lines"]);
                    println!("  {} {}", "Parties waiting:".bold(), stats["waiting_parties"]);
                    println!("  {} {}", "People waiting:".bold(), stats["waiting_people"]);
                    println!("  {} {}", "Served today:".bold(), stats["served_today"]);
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use waitline_core::domain::{PartySize, RequesterId};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pick_destination_falls_back_to_selection() {
        let mut identity = LocalIdentity::new(RequesterId::new("r1"));
        assert!(pick_destination(None, &identity).is_err());

        identity.select("Zoo", PartySize::new(2).unwrap());
        assert_eq!(pick_destination(None, &identity).unwrap(), "Zoo");
        assert_eq!(
            pick_destination(Some("Aquarium".to_string()), &identity).unwrap(),
            "Aquarium"
        );
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["waitline", "watch"]).unwrap();
        match cli.command {
            Commands::Watch {
                interval,
                threshold,
                destination,
            } => {
                assert_eq!(interval, 10);
                assert_eq!(threshold, DEFAULT_NOTIFY_THRESHOLD);
                assert!(destination.is_none());
            }
            _ => panic!("expected watch"),
        }
    }
}
