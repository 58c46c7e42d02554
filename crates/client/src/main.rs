//! `stockcart` command-line client.
//!
//! Output goes to stdout; logs go to stderr (`RUST_LOG` controls them).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use stockcart_client::{
    CartReconciler, ChannelEvent, ClientConfig, ClientState, ConnectionState, FileKeyStorage,
    Notification, NotificationKind, PushChannel, QueryClient, Reconciled, SessionKeyStore,
};
use stockcart_types::{CartItem, MovementFilter, Product};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockcart",
    version,
    about = "Inventory lookups and a shared, session-keyed cart"
)]
struct Cli {
    /// Backend base URL (overrides STOCKCART_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Realtime endpoint (overrides STOCKCART_WS_URL)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Session key file (overrides STOCKCART_KEY_FILE)
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or change the session key
    Key {
        #[command(subcommand)]
        action: Option<KeyAction>,
    },
    /// Print the cart for the active key
    Cart,
    /// Ask the server to add a movement to the cart
    Add {
        id: i64,
        /// Seconds to wait for the connection and for the resulting broadcast
        #[arg(long, default_value_t = 5)]
        wait: u64,
    },
    /// Search stock movements
    Search {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        ean: Option<String>,
        #[arg(long)]
        material: Option<String>,
    },
    /// Look up a product by material code or EAN
    Product { valor: String },
    /// Follow cart broadcasts until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum KeyAction {
    Show,
    /// Generate a fresh key (starts an empty cart)
    New,
    /// Use an existing key, e.g. one shared from another device
    Set { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,stockcart_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?.with_overrides(cli.api_url, cli.ws_url, cli.key_file)?;

    let keys = SessionKeyStore::new(FileKeyStorage::new(&config.key_file));
    let mut state = ClientState::new(CartReconciler::new(keys)?);
    let api = QueryClient::new(&config)?;

    match cli.command {
        Command::Key { action } => match action.unwrap_or(KeyAction::Show) {
            KeyAction::Show => println!("{}", state.reconciler.active_key()),
            KeyAction::New => println!("{}", state.reconciler.regenerate_key()?),
            KeyAction::Set { key } => match state.reconciler.set_key(&key) {
                Ok(key) => println!("{key}"),
                Err(e) => {
                    print_notification(state.reconciler.notification());
                    return Err(e.into());
                }
            },
        },
        Command::Cart => {
            if state.reconciler.load_cart(&api).await.is_err() {
                print_notification(state.reconciler.notification());
                bail!("cart unavailable");
            }
            print_cart(state.reconciler.cart());
        }
        Command::Add { id, wait } => add_item(&config, &mut state.reconciler, id, wait).await?,
        Command::Search { id, ean, material } => {
            let filter = MovementFilter { id, ean, material };
            match state.search_movements(&api, &filter).await {
                Ok(items) => print_items(items),
                Err(_) => {
                    print_notification(state.reconciler.notification());
                    bail!("search failed");
                }
            }
        }
        Command::Product { valor } => match state.lookup_product(&api, &valor).await {
            Ok(Some(product)) => print_product(product),
            Ok(None) => {}
            Err(_) => {
                print_notification(state.reconciler.notification());
                bail!("lookup failed");
            }
        },
        Command::Watch => watch(&config, &api, &mut state.reconciler).await?,
    }

    Ok(())
}

async fn add_item(
    config: &ClientConfig,
    reconciler: &mut CartReconciler,
    id: i64,
    wait: u64,
) -> Result<()> {
    let wait = Duration::from_secs(wait);
    let mut channel = PushChannel::connect(&config.ws_url, config.reconnect);

    if !channel.wait_connected(wait).await {
        channel.close();
        bail!("not connected to {}", config.ws_url);
    }
    if !reconciler.request_add(Some(id), &channel) {
        channel.close();
        bail!("nothing sent");
    }

    let outcome = tokio::time::timeout(wait, async {
        while let Some(event) = channel.next_event().await {
            if let ChannelEvent::Server(event) = event {
                match reconciler.handle(event) {
                    Reconciled::Discarded => continue,
                    outcome => return Some(outcome),
                }
            }
        }
        None
    })
    .await;
    channel.close();

    match outcome {
        Ok(Some(Reconciled::CartReplaced)) => print_cart(reconciler.cart()),
        Ok(Some(_)) => {
            print_notification(reconciler.notification());
            bail!("server rejected the item");
        }
        _ => println!("request sent; no cart update received yet"),
    }
    Ok(())
}

async fn watch(
    config: &ClientConfig,
    api: &QueryClient,
    reconciler: &mut CartReconciler,
) -> Result<()> {
    println!("key {}", reconciler.active_key());
    if reconciler.load_cart(api).await.is_ok() {
        print_cart(reconciler.cart());
    } else {
        print_notification(reconciler.notification());
    }

    let mut channel = PushChannel::connect(&config.ws_url, config.reconnect);
    loop {
        tokio::select! {
            event = channel.next_event() => {
                let Some(event) = event else { break };
                match event {
                    ChannelEvent::State(ConnectionState::Connected) => println!("● connected"),
                    ChannelEvent::State(ConnectionState::Disconnected) => {
                        println!("○ disconnected")
                    }
                    ChannelEvent::Server(event) => match reconciler.handle(event) {
                        Reconciled::CartReplaced => print_cart(reconciler.cart()),
                        Reconciled::ErrorReported => print_notification(reconciler.notification()),
                        Reconciled::Discarded => {}
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    channel.close();
    Ok(())
}

fn print_notification(notification: Option<&Notification>) {
    if let Some(n) = notification {
        match n.kind {
            NotificationKind::Info => println!("{}", n.message),
            NotificationKind::Error => eprintln!("error: {}", n.message),
        }
    }
}

fn print_cart(items: &[CartItem]) {
    if items.is_empty() {
        println!("(cart is empty)");
        return;
    }
    print_items(items);
}

fn print_items(items: &[CartItem]) {
    for item in items {
        println!(
            "{:>8}  {:>8}  {:<10}  {:<14}  {}",
            item.id,
            item.quantidade.map(|q| q.to_string()).unwrap_or_default(),
            item.material.as_deref().unwrap_or("-"),
            item.ean.as_deref().unwrap_or("-"),
            item.texto_breve_material.as_deref().unwrap_or(""),
        );
    }
}

fn print_product(product: &Product) {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    println!("material   {}", field(&product.cod_material));
    println!("ean        {}", field(&product.ean));
    println!("texto      {}", field(&product.texto_breve_material));
    println!("descricao  {}", field(&product.descricao));
}
