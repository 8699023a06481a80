use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use sqlx::SqlitePool;
use tokenwatch::db::{get_db_pool, migrations, subscriptions, DatabaseConfig};
use tokenwatch::utils::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("watchlist")
        .about("Manage watched wallets and token subscriptions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("add-wallet")
                .about("Register a wallet address under a short name")
                .arg(chat_id_arg())
                .arg(
                    Arg::new("name")
                        .long("name")
                        .required(true)
                        .help("Short wallet name, unique per user"),
                )
                .arg(
                    Arg::new("address")
                        .long("address")
                        .required(true)
                        .help("0x-prefixed wallet address"),
                ),
        )
        .subcommand(
            Command::new("remove-wallet")
                .about("Remove a wallet and every watch bound to it")
                .arg(chat_id_arg())
                .arg(Arg::new("name").long("name").required(true)),
        )
        .subcommand(
            Command::new("add-watch")
                .about("Watch a token contract on one of the user's wallets")
                .arg(chat_id_arg())
                .arg(
                    Arg::new("wallet")
                        .long("wallet")
                        .required(true)
                        .help("Name of a registered wallet"),
                )
                .arg(
                    Arg::new("contract")
                        .long("contract")
                        .required(true)
                        .help("BEP-20 token contract address"),
                )
                .arg(
                    Arg::new("label")
                        .long("label")
                        .required(true)
                        .help("Display label for the token, e.g. USDT"),
                )
                .arg(
                    Arg::new("min")
                        .long("min")
                        .value_parser(clap::value_parser!(f64))
                        .help("Minimum alert amount (defaults to 0)"),
                )
                .arg(
                    Arg::new("max")
                        .long("max")
                        .value_parser(clap::value_parser!(f64))
                        .help("Maximum alert amount (defaults to 999999)"),
                ),
        )
        .subcommand(
            Command::new("set-range")
                .about("Change the alert range of an existing watch")
                .arg(chat_id_arg())
                .arg(Arg::new("wallet").long("wallet").required(true))
                .arg(Arg::new("label").long("label").required(true))
                .arg(
                    Arg::new("min")
                        .long("min")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("max")
                        .long("max")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("remove-watch")
                .about("Stop watching a token on a wallet")
                .arg(chat_id_arg())
                .arg(Arg::new("wallet").long("wallet").required(true))
                .arg(Arg::new("label").long("label").required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("Show wallets and watches, for one user or everyone")
                .arg(
                    Arg::new("chat-id")
                        .long("chat-id")
                        .value_parser(clap::value_parser!(i64))
                        .help("Limit output to one user"),
                ),
        )
        .get_matches();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    migrations::run_migrations(&pool).await?;

    match matches.subcommand() {
        Some(("add-wallet", sub)) => cmd_add_wallet(&pool, sub).await?,
        Some(("remove-wallet", sub)) => cmd_remove_wallet(&pool, sub).await?,
        Some(("add-watch", sub)) => cmd_add_watch(&pool, sub).await?,
        Some(("set-range", sub)) => cmd_set_range(&pool, sub).await?,
        Some(("remove-watch", sub)) => cmd_remove_watch(&pool, sub).await?,
        Some(("list", sub)) => cmd_list(&pool, sub).await?,
        _ => unreachable!(),
    }

    Ok(())
}

fn chat_id_arg() -> Arg {
    Arg::new("chat-id")
        .long("chat-id")
        .required(true)
        .value_parser(clap::value_parser!(i64))
        .help("Telegram chat id of the owning user")
}

async fn cmd_add_wallet(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_id = *sub.get_one::<i64>("chat-id").unwrap();
    let name = sub.get_one::<String>("name").unwrap();
    let address = sub.get_one::<String>("address").unwrap();

    let wallet = subscriptions::add_wallet(pool, chat_id, name, address).await?;
    println!(
        "Added wallet '{}' ({}) for user {}",
        wallet.name, wallet.address, wallet.chat_id
    );
    Ok(())
}

async fn cmd_remove_wallet(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_id = *sub.get_one::<i64>("chat-id").unwrap();
    let name = sub.get_one::<String>("name").unwrap();

    if subscriptions::remove_wallet(pool, chat_id, name).await? {
        println!("Removed wallet '{}' and its watches", name);
    } else {
        println!("No wallet named '{}' for user {}", name, chat_id);
    }
    Ok(())
}

async fn cmd_add_watch(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_id = *sub.get_one::<i64>("chat-id").unwrap();
    let wallet = sub.get_one::<String>("wallet").unwrap();
    let contract = sub.get_one::<String>("contract").unwrap();
    let label = sub.get_one::<String>("label").unwrap();
    let min = sub.get_one::<f64>("min").copied();
    let max = sub.get_one::<f64>("max").copied();

    let watch = subscriptions::add_watch(pool, chat_id, wallet, contract, label, min, max).await?;
    println!(
        "Watching {} ({}) on wallet '{}', range [{}, {}]",
        watch.token_label, watch.token_contract, watch.wallet_name, watch.min_amount, watch.max_amount
    );
    Ok(())
}

async fn cmd_set_range(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_id = *sub.get_one::<i64>("chat-id").unwrap();
    let wallet = sub.get_one::<String>("wallet").unwrap();
    let label = sub.get_one::<String>("label").unwrap();
    let min = *sub.get_one::<f64>("min").unwrap();
    let max = *sub.get_one::<f64>("max").unwrap();

    subscriptions::set_watch_range(pool, chat_id, wallet, label, min, max).await?;
    println!("Range for {} on '{}' is now [{}, {}]", label, wallet, min, max);
    Ok(())
}

async fn cmd_remove_watch(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_id = *sub.get_one::<i64>("chat-id").unwrap();
    let wallet = sub.get_one::<String>("wallet").unwrap();
    let label = sub.get_one::<String>("label").unwrap();

    if subscriptions::remove_watch(pool, chat_id, wallet, label).await? {
        println!("Stopped watching {} on '{}'", label, wallet);
    } else {
        println!("No watch for {} on wallet '{}'", label, wallet);
    }
    Ok(())
}

async fn cmd_list(pool: &SqlitePool, sub: &ArgMatches) -> Result<()> {
    let chat_ids = match sub.get_one::<i64>("chat-id") {
        Some(id) => vec![*id],
        None => subscriptions::list_chat_ids(pool).await?,
    };

    if chat_ids.is_empty() {
        println!("No wallets registered yet.");
        return Ok(());
    }

    for chat_id in chat_ids {
        let wallets = subscriptions::list_wallets(pool, chat_id).await?;
        let watches = subscriptions::list_watches(pool, chat_id).await?;

        println!("User {} ({} wallet(s), {} watch(es)):", chat_id, wallets.len(), watches.len());
        for wallet in &wallets {
            println!("  {} {}", wallet.name, wallet.address);
            for watch in watches.iter().filter(|w| w.wallet_name == wallet.name) {
                println!(
                    "    {} {} range [{}, {}]",
                    watch.token_label, watch.token_contract, watch.min_amount, watch.max_amount
                );
            }
        }
    }
    Ok(())
}
