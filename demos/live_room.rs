use auction_realtime::{AuctionClient, AuctionClientOptions, AuctionNotification, ConnectionConfig};
use tracing_subscriber::EnvFilter;

/// Follows a live auction room: prints state changes, ticks and bid results,
/// and places a bid of `BID_AMOUNT` on the first open lot if set.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let auth_token = std::env::var("AUCTION_TOKEN").expect("AUCTION_TOKEN must be set in .env");
    let auction_id =
        std::env::var("AUCTION_ID").expect("AUCTION_ID must be set in .env");
    let bid_amount: Option<u64> = std::env::var("BID_AMOUNT")
        .ok()
        .and_then(|amount| amount.parse().ok());

    let config = ConnectionConfig::from_env();
    println!("📡 Connecting to: {}{}\n", config.origin, config.path);

    let client = AuctionClient::new(
        config,
        AuctionClientOptions {
            auth_token,
            auction_id,
            ..Default::default()
        },
    )?;

    let mut notifications = client.on_notification().await;
    client.connect().await?;

    let mut bid_placed = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notification = notifications.recv() => {
                let Some(notification) = notification else { break };

                match &notification {
                    AuctionNotification::ConnectionStateChanged(state) => {
                        println!("🔌 Connection: {}", state);
                    }
                    AuctionNotification::StateUpdated => {
                        let view = client.view().await;
                        if let Some(lot) = &view.current_lot {
                            println!(
                                "📦 Lot {} ({}) at {} - {:?}",
                                lot.id,
                                lot.player_name.as_deref().unwrap_or("unknown player"),
                                lot.current_bid,
                                lot.status
                            );
                        }
                        if let Some(user) = &view.user {
                            println!(
                                "💰 Budget {} / slots {}",
                                user.budget_remaining,
                                user.slots_open()
                            );
                        }
                    }
                    AuctionNotification::TimerTick { lot_id, remaining_secs } => {
                        println!("⏳ {}: {}s", lot_id, remaining_secs);
                    }
                    AuctionNotification::ChatReceived(chat) => {
                        println!("💬 {}: {}", chat.display_name.as_deref().unwrap_or(&chat.user_id), chat.message);
                    }
                    _ => {
                        if let Some(message) = notification.user_message() {
                            println!("ℹ️  {}", message);
                        }
                    }
                }

                if let Some(amount) = bid_amount
                    && !bid_placed
                    && matches!(notification, AuctionNotification::StateUpdated)
                {
                    match client.place_bid(amount).await {
                        Ok(request) => {
                            bid_placed = true;
                            println!("🔨 Bid {} sent on lot {}", request.amount, request.lot_id);
                        }
                        Err(e) => println!("⚠️  Bid not sent: {}", e),
                    }
                }

                if client.connection_state().is_terminal() {
                    println!("Connection is down for good, call retry() or restart");
                    break;
                }
            }
        }
    }

    client.teardown().await?;
    println!("👋 Left the auction room");
    Ok(())
}
