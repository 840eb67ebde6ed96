//! # Gift Transfer Example
//!
//! Wraps a cashu token for a Nostr public key and opens it on the other
//! side. Publishing the event to a relay is left out.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=cdk_metered=debug cargo run -p cdk-metered --example gift_transfer
//! ```

use cdk_metered::nostr::gift_wrap;
use cdk_metered::types::Proof;
use cdk_metered::{Amount, Token};
use nostr_sdk::{Keys, ToBech32};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let alice = Keys::generate();
    let bob = Keys::generate();
    println!("Bob: {}", bob.public_key().to_bech32()?);

    let token = Token::new(
        "https://mint.example.com",
        vec![Proof {
            amount: Amount::from(21),
            keyset_id: "009a1f293253e41e".to_string(),
            secret: "407915bc212be61a77e3e6d2aeb4c727980bda51cd06a6afc29e2861768a7837".to_string(),
            c: "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea".to_string(),
        }],
        Some("for the coffee".to_string()),
        Some("sat".to_string()),
    )?
    .to_string();

    let event = gift_wrap::wrap(&token, &bob.public_key(), &alice, Some("thanks!")).await?;
    println!("Gift wrap event:\n{}", serde_json::to_string_pretty(&event)?);

    match gift_wrap::unwrap(&event, &bob).await {
        Some(gift) => {
            println!("Bob opened a gift from {}", gift.sender.to_bech32()?);
            println!("Note: {}", gift.note.unwrap_or_default());
            println!("Token: {}", gift.token);
        }
        None => println!("Bob could not open the gift"),
    }

    let eve = Keys::generate();
    if gift_wrap::unwrap(&event, &eve).await.is_none() {
        println!("Eve sees nothing");
    }

    Ok(())
}
