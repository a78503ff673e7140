use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use zameen::assistant::{AssistantBackend, AssistantClient};
use zameen::config::{self, Config};
use zameen::storage::FileStore;
use zameen::{ChatController, ControllerOptions, Dispatch, Message, Origin, Rejection, ReplyOutcome};

const PLACEHOLDER: &str = "Ask me about prices, listings, or locations.";

#[derive(Parser)]
#[command(name = "zameen-chat")]
#[command(about = "Zameen assistant chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: ZAMEEN_CONFIG_PATH or ~/.zameen/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Probe the assistant's health endpoint once.
    Health {
        /// Config file path (default: ZAMEEN_CONFIG_PATH or ~/.zameen/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Assistant base URL (overrides config and ZAMEEN_API_URL)
        #[arg(long, value_name = "URL")]
        api: Option<String>,
    },

    /// Chat with the assistant (interactive). History is restored from and saved to the storage file.
    Chat {
        /// Config file path (default: ZAMEEN_CONFIG_PATH or ~/.zameen/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Assistant base URL (overrides config and ZAMEEN_API_URL)
        #[arg(long, value_name = "URL")]
        api: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("zameen-chat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Health { config, api }) => match run_health(config, api).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                log::error!("health failed: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Chat { config, api }) => {
            if let Err(e) = run_chat(config, api).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = zameen::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn build_client(config: &Config, api: Option<String>) -> AssistantClient {
    let base_url = api.unwrap_or_else(|| config::resolve_api_base_url(config));
    log::info!("using assistant at {}", base_url);
    AssistantClient::new(Some(base_url))
}

async fn run_health(config_path: Option<PathBuf>, api: Option<String>) -> anyhow::Result<bool> {
    let (config, _) = config::load_config(config_path)?;
    let client = build_client(&config, api);
    match client.health().await {
        Ok(h) if h.is_ok() => {
            println!("ready");
            Ok(true)
        }
        Ok(h) => {
            println!("not ready: status {:?}", h.status);
            Ok(false)
        }
        Err(e) => {
            println!("not ready: {}", e);
            Ok(false)
        }
    }
}

fn print_message(m: &Message) {
    match m.origin {
        Origin::User => println!("> {}", m.text),
        Origin::Assistant => println!("< {}", m.text),
    }
}

fn print_history(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", PLACEHOLDER);
        return;
    }
    for m in messages {
        print_message(m);
    }
}

fn print_help() {
    println!(
        "available commands:\n\n/clear - clear the conversation\n/open, /close, /toggle - set panel visibility\n/history - show the conversation\n/help - show this help message\n/exit - leave"
    );
}

async fn run_chat(config_path: Option<PathBuf>, api: Option<String>) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    let storage_path = config::resolve_storage_path(&config, &path);
    log::info!("chat state stored in {}", storage_path.display());

    let client = build_client(&config, api);
    let controller = ChatController::mount(
        Arc::new(client),
        Arc::new(FileStore::new(storage_path)),
        ControllerOptions::from(&config),
    );

    print_history(&controller.messages());
    if controller.is_checking() {
        println!("Loading assistant — please wait");
        if !controller.wait_ready().await {
            anyhow::bail!("assistant readiness check stopped");
        }
    }
    println!("Assistant ready. Type /help for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        match input.to_ascii_lowercase().as_str() {
            "/clear" => {
                controller.clear();
                println!("{}", PLACEHOLDER);
                continue;
            }
            "/open" => {
                controller.set_visible(true);
                continue;
            }
            "/close" => {
                controller.set_visible(false);
                continue;
            }
            "/toggle" => {
                let visible = controller.toggle_visible();
                println!("panel {}", if visible { "open" } else { "closed" });
                continue;
            }
            "/history" => {
                print_history(&controller.messages());
                continue;
            }
            "/help" => {
                print_help();
                continue;
            }
            _ => {}
        }

        match controller.send(input) {
            Dispatch::Accepted(pending) => {
                println!("Typing…");
                match pending.wait().await {
                    ReplyOutcome::Appended => {
                        if let Some(reply) = controller.messages().last() {
                            print_message(reply);
                        }
                    }
                    ReplyOutcome::Suppressed => {
                        log::debug!("assistant repeated its previous answer");
                    }
                    ReplyOutcome::Discarded => {}
                }
            }
            Dispatch::Rejected(Rejection::NotReady) => {
                println!("Loading assistant...");
            }
            Dispatch::Rejected(_) => {}
        }
    }

    controller.dispose();
    Ok(())
}
