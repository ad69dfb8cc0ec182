//! Run with: cargo run -p shiori-runtime --example watchlist
//!
//! Signs in with SHIORI_EMAIL / SHIORI_PASSWORD, syncs the user's lists,
//! and prints the watchlist. Requires a configured userdata service.

use shiori_api::userdata::auth;
use shiori_core::config::AppConfig;
use shiori_core::session::{IdentitySnapshot, UserHandle};
use shiori_runtime::Runtime;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("shiori=debug")
        .init();

    let config = AppConfig::load().expect("config");
    let email = std::env::var("SHIORI_EMAIL").expect("SHIORI_EMAIL not set");
    let password = std::env::var("SHIORI_PASSWORD").expect("SHIORI_PASSWORD not set");

    let session = auth::sign_in(
        &config.userdata.base_url,
        &config.userdata.api_key,
        &email,
        &password,
    )
    .await
    .expect("sign in");

    let tracker = Runtime::from_config(&config);
    tracker
        .set_identity(IdentitySnapshot {
            user: Some(UserHandle {
                user_id: session.user.id,
                access_token: session.access_token,
            }),
            resolving: false,
        })
        .await;

    let items = tracker.watchlist().await;
    if items.is_empty() {
        println!("Watchlist is empty.");
    } else {
        for item in &items {
            println!(
                "{} [{}]{}",
                item.title,
                item.media_kind,
                if item.watched { " (watched)" } else { "" }
            );
        }
    }
}
