use clap::Parser;
use log::{error, info};
use server::config::{Args, ServerConfig};
use server::network::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    info!(
        "Field {}x{}, paddles {}x{}, ball {} at {} units/tick",
        config.game.field_width,
        config.game.field_height,
        config.game.paddle_width,
        config.game.paddle_height,
        config.game.ball_size,
        config.game.ball_speed
    );

    // Bind or configuration failures are the only fatal errors
    let server = Server::bind(config).await?;
    let handle = server.handle();
    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
            let _ = server_task.await;
        }
    }

    Ok(())
}
