//! Summa Web3 CLI - wallet-authenticated article summarisation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use dialoguer::Input;
use summa_web3::{auth, logging, Config, Pipeline, Storage, StoredSummary};

#[derive(Parser)]
#[command(name = "summa-web3")]
#[command(author, version, about = "Wallet-authenticated article summarisation", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the message a wallet must sign
    Message,
    /// Sign the message with a private key (for testing clients)
    Sign {
        /// Hex-encoded secp256k1 private key
        #[arg(long)]
        private_key: String,
    },
    /// Summarise an article on behalf of a wallet
    Summarise {
        /// Wallet address that signed the message
        #[arg(long)]
        wallet: String,
        /// Signature over the message; prompted for when omitted
        #[arg(long)]
        signature: Option<String>,
        /// URL of the article
        url: String,
        /// Show extracted text instead of summarising
        #[arg(long)]
        raw: bool,
    },
    /// List stored summaries for a wallet
    History {
        /// Wallet address
        wallet: String,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Message => {
            println!("{}", auth::message_to_sign());
        }
        Commands::Sign { private_key } => {
            let key = auth::signing_key_from_hex(&private_key)?;
            println!("{} {}", "Address:  ".bold(), auth::address_of(key.verifying_key()));
            println!("{} {}", "Signature:".bold(), auth::sign_message(&key)?);
        }
        Commands::Summarise {
            wallet,
            signature,
            url,
            raw,
        } => {
            let signature = match signature {
                Some(signature) => signature,
                None => {
                    println!("Sign this message with {}:\n\n  {}\n", wallet, auth::message_to_sign());
                    Input::<String>::new()
                        .with_prompt("Signature")
                        .interact_text()?
                }
            };

            let config = Config::load()?;
            let pipeline = Pipeline::from_config(&config)?;

            if raw {
                // Just show extracted text
                println!("Fetching: {}", url);
                let content = pipeline.extract_only(&wallet, &signature, &url).await?;
                let title = content.title.unwrap_or_else(|| "No title".to_string());
                println!("\n=== {} ===\n", title);
                println!("{}", content.text);
                println!("\n--- Extracted {} characters ---", content.text.chars().count());
                return Ok(());
            }

            let backends: Vec<String> = pipeline
                .engine()
                .backends()
                .iter()
                .map(|b| b.to_string())
                .collect();
            println!("Summarising {} ({})...\n", url, backends.join(" -> ").dimmed());

            let storage = Storage::open(&config.storage.path)?;
            match pipeline.run_and_store(&storage, &wallet, &signature, &url).await {
                Ok(stored) => print_summary(&stored),
                Err(e) => {
                    eprintln!("{} {} (stage: {:?}, status: {})", "Error:".red().bold(), e, e.stage(), e.status_code());
                    std::process::exit(1);
                }
            }
        }
        Commands::History { wallet } => {
            let config = Config::load()?;
            let storage = Storage::open(&config.storage.path)?;
            let summaries = storage.list_by_wallet(&wallet)?;

            if summaries.is_empty() {
                println!("No stored summaries for {}.", wallet);
            } else {
                println!("Stored summaries for {} ({}):\n", wallet, summaries.len());
                for stored in &summaries {
                    print_summary(stored);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}

fn print_summary(stored: &StoredSummary) {
    println!(
        "📄 #{} {} ({})",
        stored.id,
        stored.article_url.bold(),
        stored.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("   {}\n", stored.summary_content);
}
