use std::io;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use clap::Parser;
use spdlog::{info, warn};

use draftpad::config::{find_config, read_config, Config};
use draftpad::logger::configure_logger;
use draftpad::server::server_run;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory where posts are stored. Defaults to ./posts
    posts_dir: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not open the browser after the server starts
    #[arg(long)]
    no_open: bool,
}

fn open_config(args: &Args) -> anyhow::Result<Config> {
    let path = args.config.clone().or_else(find_config);
    let config = match path {
        Some(path) => {
            info!("Reading config from {}", path.display());
            read_config(&path)
                .with_context(|| format!("reading configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    Ok(config)
}

fn open_browser(url: &str) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    Command::new("open").arg(url).spawn()?;

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(url).spawn()?;

    #[cfg(target_os = "windows")]
    Command::new("cmd").args(["/c", "start", url]).spawn()?;

    Ok(())
}

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = open_config(&args)?;
    if let Some(posts_dir) = args.posts_dir {
        config.paths.posts_dir = posts_dir;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_open {
        config.server.auto_open = false;
    }

    if let Err(e) = configure_logger(&config) {
        eprintln!("Error configuring logger: {}", e);
    }

    let url = format!("http://{}:{}", config.server.address, config.server.port);
    info!("Listening on {}", url);

    if config.server.auto_open {
        if let Err(e) = open_browser(&url) {
            warn!("Failed to open browser: {}", e);
        }
    }

    server_run(config).await?;

    Ok(())
}
