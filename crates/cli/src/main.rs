use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "vetbot")]
#[command(about = "VetBot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file (no secrets; those come from the environment).
    Init {
        /// Config file path (default: VETBOT_CONFIG_PATH or ~/.vetbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook gateway.
    Serve {
        /// Config file path (default: VETBOT_CONFIG_PATH or ~/.vetbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message to a running gateway's /webhook and print the reply.
    Ask {
        /// Config file path, used to find the gateway address
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Gateway base URL (default: http://{bind}:{port} from config)
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Sender phone number (replies are also delivered there over WhatsApp)
        #[arg(long)]
        phone: String,

        /// Message text
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("vetbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask {
            config,
            url,
            phone,
            message,
        }) => {
            if let Err(e) = run_ask(config, url, phone, message).await {
                log::error!("ask failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(vetbot::config::default_config_path);
    if vetbot::config::init_config_file(&path)? {
        println!("wrote default configuration to {}", path.display());
    } else {
        println!("configuration already exists at {}", path.display());
    }
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = vetbot::config::load_config(config_path)?;
    log::debug!("config loaded from {}", path.display());
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    vetbot::gateway::run_gateway(config).await
}

#[derive(Debug, Deserialize)]
struct AskReply {
    reply: String,
    to: String,
}

async fn run_ask(
    config_path: Option<std::path::PathBuf>,
    url: Option<String>,
    phone: String,
    message: String,
) -> anyhow::Result<()> {
    let base = match url {
        Some(u) => u.trim_end_matches('/').to_string(),
        None => {
            let (config, _) = vetbot::config::load_config(config_path)?;
            format!("http://{}:{}", config.gateway.bind.trim(), config.gateway.port)
        }
    };
    let body = vetbot::gateway::DirectMessage { phone, message };
    let res = reqwest::Client::new()
        .post(format!("{}/webhook", base))
        .json(&body)
        .send()
        .await?;
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        anyhow::bail!("gateway returned {}: {}", status, text);
    }
    let reply: AskReply = res.json().await?;
    log::debug!("reply addressed to {}", reply.to);
    println!("{}", reply.reply.trim());
    Ok(())
}
