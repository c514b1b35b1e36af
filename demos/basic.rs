use auction_realtime::{AuctionClient, AuctionClientOptions, ConnectionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Create client
    let client = AuctionClient::new(
        ConnectionConfig::new("http://localhost:3001"),
        AuctionClientOptions {
            auth_token: "your-session-token".to_string(),
            auction_id: "your-auction-id".to_string(),
            ..Default::default()
        },
    )?;

    // Connect
    println!("Connecting to the auction room...");
    client.connect().await?;
    println!("Connection state: {}", client.connection_state());

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    // Leave the room
    println!("Leaving...");
    client.teardown().await?;
    println!("Done!");

    Ok(())
}
