use clap::Parser;
use client::game::ClientGameState;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Move the paddle automatically towards the ball
    #[arg(short = 'a', long)]
    autopilot: bool,

    /// Leave the session after this many seconds (0 plays until the server closes)
    #[arg(short = 'd', long, default_value_t = 0)]
    duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let mut client = Client::connect(&args.server).await?;
    let mut state = ClientGameState::new();

    let assignment = client.wait_for_assignment().await?;
    state.apply_packet(shared::Packet::Welcome {
        session_id: assignment.session_id,
        slot: assignment.slot,
        config: assignment.config,
    });

    let duration = (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs));
    client.run(&mut state, args.autopilot, duration).await?;

    if let Some(snapshot) = &state.latest {
        info!(
            "Final score {} - {} after {} ticks",
            snapshot.score[0], snapshot.score[1], snapshot.tick
        );
    }

    client.close().await?;
    Ok(())
}
