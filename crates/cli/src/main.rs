//! CLI for the ZeroSpoil inventory and redistribution board.
//!
//! Every invocation is one "tab": it shares `--data-dir` with all other
//! tabs and keeps a non-remembered login under `<data-dir>/tabs/<tab>`.

use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use zerospoil_core::{format_qty, ItemDraft, ItemId, PostId, Status, ZeroSpoilError};
use zerospoil_engine::migrate::{parse_dmy_date, parse_iso_date};
use zerospoil_engine::{
    report, Accounts, AppView, Inbox, InventoryQuery, InventorySession, Ledger, SortDirection,
    SortKey,
};
use zerospoil_store::{FileStore, KeyValueStore};

#[derive(Parser, Debug)]
#[command(name = "zerospoil", version, about = "Food inventory and redistribution board")]
struct Cli {
    /// Shared data directory (the "browser profile").
    #[arg(short, long, env = "ZEROSPOIL_DATA_DIR", default_value = "./zerospoil-data", global = true)]
    data_dir: PathBuf,

    /// Tab name; logins without --remember are scoped to it.
    #[arg(short, long, env = "ZEROSPOIL_TAB", default_value = "default", global = true)]
    tab: String,

    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct ItemFields {
    #[arg(long)]
    store_id: Option<String>,
    #[arg(long)]
    store_name: Option<String>,
    #[arg(long)]
    store_address: Option<String>,
    #[arg(long)]
    product: Option<String>,
    /// Kilograms.
    #[arg(long)]
    qty: Option<Decimal>,
    /// yyyy-mm-dd or dd/mm/yyyy.
    #[arg(long)]
    expiry: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account.
    Register {
        username: String,
        #[arg(long, env = "ZEROSPOIL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Log in to this tab, or to every tab with --remember.
    Login {
        username: String,
        #[arg(long, env = "ZEROSPOIL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value_t = false)]
        remember: bool,
    },
    Logout,
    Whoami,
    /// Add an inventory item.
    Add {
        #[command(flatten)]
        fields: ItemFields,
    },
    /// Change an unposted item; omitted fields keep their value.
    Edit {
        id: String,
        #[command(flatten)]
        fields: ItemFields,
    },
    /// Remove an unposted item.
    Delete { id: String },
    /// Remove every unposted item.
    Clear,
    /// Show the inventory.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long, default_value_t = false)]
        desc: bool,
    },
    /// Offer an item on the redistribution board.
    Post { item_id: String },
    /// Show open posts.
    Board,
    /// Claim kilograms from someone else's post.
    Claim { post_id: String, qty: Decimal },
    Notifications {
        #[arg(long, default_value_t = false)]
        mark_read: bool,
    },
    /// Follow the board and inventory as other tabs change them.
    Watch {
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },
}

fn parse_expiry(raw: &str) -> Result<NaiveDate, ZeroSpoilError> {
    let raw = raw.trim();
    parse_iso_date(raw)
        .or_else(|| parse_dmy_date(raw))
        .ok_or_else(|| ZeroSpoilError::InvalidInput("Please select a valid date.".into()))
}

impl ItemFields {
    /// Overlays the given fields on `base`.
    fn into_draft(self, mut base: ItemDraft) -> Result<ItemDraft, ZeroSpoilError> {
        if let Some(v) = self.store_id {
            base.store_id = v;
        }
        if let Some(v) = self.store_name {
            base.store_name = v;
        }
        if let Some(v) = self.store_address {
            base.store_address = v;
        }
        if let Some(v) = self.product {
            base.product = v;
        }
        if self.qty.is_some() {
            base.qty = self.qty;
        }
        if let Some(raw) = self.expiry {
            base.expiry_date = Some(parse_expiry(&raw)?);
        }
        if self.category.is_some() {
            base.category = self.category;
        }
        Ok(base)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn logout_summary(user: &str) -> serde_json::Value {
    serde_json::json!({ "loggedOut": user })
}

fn clear_summary(removed: usize, kept: usize) -> serde_json::Value {
    serde_json::json!({ "removed": removed, "kept": kept })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ZeroSpoilError>() {
            Some(err) if err.is_state_conflict() => tracing::warn!(error = %err, "rejected"),
            _ => tracing::error!(error = %e, "command failed"),
        }
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let shared = FileStore::open(&cli.data_dir)?;
    let tab_dir = cli.data_dir.join("tabs").join(&cli.tab);
    let tab: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&tab_dir)?);
    let ledger = Ledger::new(Arc::new(shared.clone()));
    let accounts = Accounts::new(ledger.clone(), tab);
    tracing::debug!(data_dir = %cli.data_dir.display(), tab = %cli.tab, "stores opened");

    let now = Utc::now();
    let today = Local::now().naive_local();

    // Everything past register/login acts as the logged-in user.
    let command = match cli.command {
        Commands::Register {
            username,
            password,
            confirm,
        } => {
            let account = accounts.register(&username, &password, &confirm, now)?;
            if cli.json {
                print_json(&serde_json::json!({ "username": account.username }))?;
            } else {
                println!("Registered {}. You can log in now.", account.username);
            }
            return Ok(());
        }
        Commands::Login {
            username,
            password,
            remember,
        } => {
            let session = accounts.login(&username, &password, remember, now)?;
            if cli.json {
                print_json(&session)?;
            } else {
                println!("Welcome, {}!", session.username);
            }
            return Ok(());
        }
        other => other,
    };

    let user = accounts.require_session()?.username;

    match command {
        Commands::Register { .. } | Commands::Login { .. } => {}
        Commands::Logout => {
            accounts.logout()?;
            if cli.json {
                print_json(&logout_summary(&user))?;
            } else {
                println!("Logged out {user}.");
            }
        }
        Commands::Whoami => {
            if cli.json {
                print_json(&serde_json::json!({ "username": user }))?;
            } else {
                println!("{user}");
            }
        }
        Commands::Add { fields } => {
            let mut session = InventorySession::load(&ledger, &user)?;
            let draft = fields.into_draft(ItemDraft::default())?;
            let id = session.add_item(&ledger, draft, now)?;
            if cli.json {
                print_json(&session.find(&id))?;
            } else {
                println!("Added item {id}.");
            }
        }
        Commands::Edit { id, fields } => {
            let id = ItemId::from(id);
            let mut session = InventorySession::load(&ledger, &user)?;
            let base = session
                .find(&id)
                .map(ItemDraft::from)
                .ok_or_else(|| ZeroSpoilError::ItemNotFound(id.to_string()))?;
            session.edit_item(&ledger, &id, fields.into_draft(base)?)?;
            if cli.json {
                print_json(&session.find(&id))?;
            } else {
                println!("Updated item {id}.");
            }
        }
        Commands::Delete { id } => {
            let mut session = InventorySession::load(&ledger, &user)?;
            let removed = session.remove_item(&ledger, &ItemId::from(id))?;
            if cli.json {
                print_json(&removed)?;
            } else {
                println!("Removed {} ({}).", removed.product, removed.id);
            }
        }
        Commands::Clear => {
            let mut session = InventorySession::load(&ledger, &user)?;
            let removed = session.clear_unposted(&ledger)?;
            let kept = session.items().len();
            if cli.json {
                print_json(&clear_summary(removed, kept))?;
            } else if kept > 0 {
                println!("Removed {removed} item(s); {kept} posted item(s) kept.");
            } else {
                println!("Removed {removed} item(s).");
            }
        }
        Commands::List {
            search,
            status,
            category,
            sort,
            desc,
        } => {
            let session = InventorySession::load(&ledger, &user)?;
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let query = InventoryQuery {
                search,
                status,
                category,
                sort: sort.map(|key| (key, direction)),
            };
            let views = query.apply(session.items(), today);
            if cli.json {
                print_json(&views)?;
            } else {
                print!("{}", report::render_inventory(&user, &views));
            }
        }
        Commands::Post { item_id } => {
            let mut session = InventorySession::load(&ledger, &user)?;
            let post = zerospoil_engine::post_for_redistribution(
                &ledger,
                &mut session,
                &ItemId::from(item_id),
                now,
            )?;
            if cli.json {
                print_json(&post)?;
            } else {
                println!(
                    "Posted {} ({} kg) as {}.",
                    post.product,
                    format_qty(post.qty_total),
                    post.post_id
                );
            }
        }
        Commands::Board => {
            let board = ledger.board()?;
            let open = zerospoil_engine::open_posts(&board);
            if cli.json {
                print_json(&open)?;
            } else {
                print!("{}", report::render_board(&user, &open));
            }
        }
        Commands::Claim { post_id, qty } => {
            let receipt =
                zerospoil_engine::claim(&ledger, &user, &PostId::from(post_id), qty, now)?;
            if cli.json {
                print_json(&receipt)?;
            } else if receipt.closed {
                println!(
                    "Claimed {} kg. The post is now closed.",
                    format_qty(receipt.claimed)
                );
            } else {
                println!(
                    "Claimed {} kg. {} kg left on the post.",
                    format_qty(receipt.claimed),
                    format_qty(receipt.remaining)
                );
            }
        }
        Commands::Notifications { mark_read } => {
            let mut inbox = Inbox::load(&ledger, &user)?;
            if cli.json {
                print_json(&serde_json::json!({
                    "unread": inbox.unread_count(),
                    "notifications": inbox.recent(),
                }))?;
            } else {
                print!("{}", report::render_inbox(&inbox));
            }
            if mark_read {
                let flipped = inbox.mark_all_read(&ledger)?;
                tracing::info!(user = %user, flipped, "notifications marked read");
            }
        }
        Commands::Watch { poll_ms } => {
            let mut changes = shared.watch(Duration::from_millis(poll_ms))?;
            let mut view = AppView::load(&ledger, &user)?;
            let json = cli.json;
            let render = move |view: &AppView| {
                let now = Local::now().naive_local();
                let views = InventoryQuery::default().apply(view.inventory.items(), now);
                let open = zerospoil_engine::open_posts(&view.board);
                if json {
                    let snapshot = serde_json::json!({
                        "inventory": views,
                        "board": open,
                        "unread": view.inbox.unread_count(),
                    });
                    println!("{snapshot}");
                } else {
                    print!("{}", report::render_inventory(view.username(), &views));
                    print!("{}", report::render_board(view.username(), &open));
                    print!("{}", report::render_inbox(&view.inbox));
                }
            };
            render(&view);
            tracing::info!(user = %user, poll_ms, "watching for changes; Ctrl-C to stop");

            tokio::select! {
                res = zerospoil_engine::follow_changes(&ledger, &mut view, &mut changes, render) => res?,
                _ = tokio::signal::ctrl_c() => tracing::info!("stopped"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_is_global() {
        for args in [
            ["zerospoil", "--json", "clear"],
            ["zerospoil", "clear", "--json"],
            ["zerospoil", "logout", "--json"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(cli.json);
        }
        let cli = Cli::try_parse_from(["zerospoil", "delete", "abc", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Delete { ref id } if id == "abc"));
    }

    #[test]
    fn summaries_are_objects() {
        assert_eq!(
            clear_summary(3, 1),
            serde_json::json!({ "removed": 3, "kept": 1 })
        );
        assert_eq!(logout_summary("alice")["loggedOut"], "alice");
    }

    #[test]
    fn edit_overlays_only_given_fields() {
        let base = ItemDraft {
            store_id: "S1".into(),
            product: "Milk".into(),
            qty: Some(Decimal::new(2, 0)),
            ..Default::default()
        };
        let fields = ItemFields {
            qty: Some(Decimal::new(5, 0)),
            expiry: Some("07/11/2026".into()),
            ..Default::default()
        };
        let draft = fields.into_draft(base).unwrap();
        assert_eq!(draft.product, "Milk");
        assert_eq!(draft.qty, Some(Decimal::new(5, 0)));
        assert_eq!(draft.expiry_date, NaiveDate::from_ymd_opt(2026, 11, 7));

        let bad = ItemFields {
            expiry: Some("soon".into()),
            ..Default::default()
        };
        assert!(bad.into_draft(ItemDraft::default()).is_err());
    }
}
