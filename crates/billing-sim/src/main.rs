//! # Billing Sim
//!
//! Runs a billing session against the loopback bridge: connect, query the
//! catalog, buy the first product, and consume it.
//!
//! ## Usage
//!
//! ```bash
//! export BILLING_PUBLIC_KEY=pk-demo
//! export BILLING_PAYLOAD_SHAPE=current   # or legacy
//! RUST_LOG=debug billing-sim
//! ```

use billing_client::{BillingSession, ConnectionEvent, Listeners, SessionConfig};
use billing_core::{
    BillingFlowParams, BridgeAvailability, ConsumeParams, ConsumeResult, Product,
    ProductDetailsParams, ProductDetailsResult, ProductType, PurchasesResult,
    QueryProductDetailsParams,
};
use billing_sim::{LoopbackBridge, LoopbackOptions, ProductCatalog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CALLBACK_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let config = SessionConfig::from_env()?;
    let catalog = ProductCatalog::load_default()?;
    info!("Payload shape: {}", config.payload_shape.as_str());
    info!("Products loaded: {}", catalog.products.len());

    let inapp_ids: Vec<String> = catalog
        .active_products()
        .filter(|p| p.product_type == ProductType::InApp)
        .map(|p| p.id.clone())
        .collect();

    let bridge = Arc::new(LoopbackBridge::with_options(
        catalog,
        config.payload_shape,
        LoopbackOptions::default().with_feature(1),
        &tokio::runtime::Handle::current(),
    ));
    let session = BillingSession::new(config, BridgeAvailability::detect(Some(bridge)));

    let (connection_tx, mut connection) = mpsc::unbounded_channel::<ConnectionEvent>();
    let (details_tx, mut details) = mpsc::unbounded_channel::<ProductDetailsResult>();
    let (updates_tx, mut updates) = mpsc::unbounded_channel::<PurchasesResult>();
    let (consume_tx, mut consumed) = mpsc::unbounded_channel::<ConsumeResult>();

    session.start(
        Listeners::new()
            .on_connection(move |event| {
                let _ = connection_tx.send(event);
            })
            .on_product_details(move |result| {
                let _ = details_tx.send(result);
            })
            .on_purchases_updated(move |result| {
                let _ = updates_tx.send(result);
            })
            .on_consume(move |result| {
                let _ = consume_tx.send(result);
            }),
    );

    match wait(&mut connection).await? {
        ConnectionEvent::SetupFinished(result) if result.is_ok() => info!("✅ Connected"),
        event => anyhow::bail!("Billing setup failed: {:?}", event),
    }
    info!("Feature 1 supported: {}", session.is_feature_supported(1).is_ok());

    if inapp_ids.is_empty() {
        warn!("No in-app products in catalog, nothing to buy");
        session.end_connection();
        return Ok(());
    }

    let products = inapp_ids
        .iter()
        .map(|id| {
            Product::builder()
                .product_id(id.as_str())?
                .product_type_tag(ProductType::InApp)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;
    session.query_product_details_async(
        &QueryProductDetailsParams::builder()
            .product_list(products)?
            .build()?,
    );

    let catalog_result = wait(&mut details).await?;
    for product in &catalog_result.product_details {
        if let Some(offer) = &product.one_time_purchase_offer_details {
            info!("🛒 {} - {} ({})", product.product_id, product.title, offer.price().display());
        }
    }

    let Some(first) = catalog_result.product_details.first().cloned() else {
        anyhow::bail!("Backend returned no product details");
    };
    let flow = BillingFlowParams::builder()
        .product_details_params_list(vec![ProductDetailsParams::builder()
            .product_details(first)
            .build()?])?
        .obfuscated_account_id("demo-account")?
        .build()?;
    info!("Launch result: {}", session.launch_billing_flow(&flow));

    let update = wait(&mut updates).await?;
    for purchase in &update.purchases {
        info!("💳 Purchased {:?} token={}", purchase.products, purchase.purchase_token);
        session.consume_async(
            &ConsumeParams::builder()
                .purchase_token(purchase.purchase_token.clone())?
                .build()?,
        );
        let result = wait(&mut consumed).await?;
        info!("Consumed {}: {}", result.purchase_token, result.billing_result);
    }

    session.end_connection();
    Ok(())
}

async fn wait<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> anyhow::Result<T> {
    timeout(CALLBACK_WAIT, rx.recv())
        .await
        .map_err(|_| anyhow::anyhow!("Timed out waiting for billing callback"))?
        .ok_or_else(|| anyhow::anyhow!("Listener channel closed"))
}

fn print_banner() {
    println!(
        r#"
  💰 Billing Sim 💰
  ━━━━━━━━━━━━━━━━━━━━━━━
  Loopback billing session
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
