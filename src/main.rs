//! FX Signal Copier
//!
//! Parses free-form trade signals, sizes positions against a fixed risk
//! fraction of the account balance, and forwards confirmed orders to a
//! trading venue. Runs against the built-in simulated venue; a real
//! broker client plugs in behind the `venue::TradingVenue` trait.

mod config;
mod report;
mod risk;
mod session;
mod signal;
mod venue;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::AppConfig;
use crate::session::{FlowIntent, RenderHint, SessionStore, Stage, TradeFlow, HELP_TEXT};
use crate::venue::SimVenue;

/// FX signal copier CLI.
#[derive(Parser)]
#[command(name = "fxcopier")]
#[command(about = "Size and place trades from free-form FX signals", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Simulated account balance in account currency
    #[arg(short, long, default_value = "10000")]
    balance: f64,

    /// Risk fraction per trade (overrides RISK_FACTOR)
    #[arg(short, long)]
    risk: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Size a signal and show the trade report without placing orders
    Calculate {
        /// Signal text; read from stdin when omitted
        signal: Option<String>,
    },

    /// Size a signal and place the orders immediately
    Trade {
        /// Signal text; read from stdin when omitted
        signal: Option<String>,
    },

    /// Interactive console session (/trade, /calculate, /yes, /no, /cancel)
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = AppConfig::from_env();
    if let Some(risk) = cli.risk {
        config.risk_fraction = Decimal::try_from(risk)?;
    }

    let venue = demo_venue(Decimal::try_from(cli.balance)?);
    let flow = TradeFlow::new(config.clone(), Arc::new(venue));

    info!(
        balance = cli.balance,
        risk = %config.risk_fraction,
        "using simulated venue"
    );

    match cli.command {
        Commands::Calculate { signal } => {
            let text = read_signal(signal).await?;
            let mut store = SessionStore::new();
            let session = store.open("cli", FlowIntent::CalculateOnly);

            print_replies(&flow.on_message(session, &text).await);

            // One-shot mode: nothing to confirm interactively.
            if session.stage == Stage::AwaitingConfirmation {
                flow.cancel(session);
                println!("(calculation only; run `fxcopier trade` to place these orders)");
            }
        }

        Commands::Trade { signal } => {
            let text = read_signal(signal).await?;
            let mut store = SessionStore::new();
            let session = store.open("cli", FlowIntent::Execute);

            print_replies(&flow.on_message(session, &text).await);
        }

        Commands::Run => {
            run_console(&flow).await?;
        }
    }

    Ok(())
}

/// Interactive console host: one conversation, commands routed to the
/// trade flow the way a chat transport would.
async fn run_console(flow: &TradeFlow) -> Result<()> {
    const CONVERSATION: &str = "console";

    println!("Welcome to the FX Signal Copier!");
    println!("Type /help for instructions, /quit to leave.\n");

    let mut store = SessionStore::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        match input.as_str() {
            "/quit" | "/exit" => break,
            "/start" => println!("Welcome to the FX Signal Copier!\nUse /help for instructions."),
            "/help" => println!("{HELP_TEXT}"),
            "/trade" | "/calculate" => {
                let intent = if input == "/trade" {
                    FlowIntent::Execute
                } else {
                    FlowIntent::CalculateOnly
                };
                let session = store.open(CONVERSATION, intent);

                println!("Please enter the trade signal (finish with an empty line):");
                let text = read_block(&mut lines).await?;
                print_replies(&flow.on_message(session, &text).await);
            }
            "/cancel" => match store.get_mut(CONVERSATION) {
                Some(session) if session.stage != Stage::Terminated => {
                    let reply = flow.cancel(session);
                    println!("{}", reply.text);
                }
                _ => println!("Nothing to cancel."),
            },
            other => match store.get_mut(CONVERSATION) {
                Some(session) if session.stage != Stage::Terminated => {
                    print_replies(&flow.on_message(session, other).await);
                }
                _ => println!("Unknown command. /help for instructions."),
            },
        }

        store.sweep_terminated();
    }

    Ok(())
}

/// Signal from the CLI argument, or stdin up to EOF.
async fn read_signal(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut text = String::new();
            while let Some(line) = lines.next_line().await? {
                text.push_str(&line);
                text.push('\n');
            }
            Ok(text)
        }
    }
}

/// Read lines until the first empty one, joined as a single message.
async fn read_block(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
) -> Result<String> {
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

fn print_replies(replies: &[session::Reply]) {
    for reply in replies {
        match reply.render {
            RenderHint::Plain => println!("{}", reply.text),
            RenderHint::Preformatted => println!("\n{}", reply.text),
        }
    }
}

/// Simulated venue seeded with representative quotes.
fn demo_venue(balance: Decimal) -> SimVenue {
    SimVenue::new(balance)
        .with_quote("GBPUSD", dec!(1.2500), dec!(1.2502))
        .with_quote("EURUSD", dec!(1.1000), dec!(1.1002))
        .with_quote("USDJPY", dec!(145.50), dec!(145.52))
        .with_quote("XAUUSD", dec!(1900.0), dec!(1900.5))
        .with_quote("XAGUSD", dec!(23.450), dec!(23.470))
}
