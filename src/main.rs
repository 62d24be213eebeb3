use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use shopassist::app::{run_interactive, run_lookup_command, run_ocr_command, run_say_command};
use shopassist::cli::{Cli, Commands, ConfigAction};
use shopassist::config::Config;
use shopassist::daemon::run_daemon;
use shopassist::diagnostics::check_dependencies;
use shopassist::ipc::client::send_command;
use shopassist::ipc::protocol::{Command, Response};
use shopassist::ipc::server::IpcServer;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    shopassist::logging::init(cli.quiet, cli.verbose);

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            run_interactive(config).await?;
        }
        Some(Commands::Daemon { socket }) => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            run_daemon(config, socket, cli.verbose).await?;
        }
        Some(Commands::Scan { socket }) => handle_ipc_command(socket, Command::Scan).await?,
        Some(Commands::Recognize { socket }) => {
            handle_ipc_command(socket, Command::Recognize).await?
        }
        Some(Commands::Grant { socket }) => handle_ipc_command(socket, Command::Grant).await?,
        Some(Commands::Status { socket }) => handle_ipc_command(socket, Command::Status).await?,
        Some(Commands::Stop { socket }) => handle_ipc_command(socket, Command::Shutdown).await?,
        Some(Commands::Lookup { code }) => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            if let Err(e) = run_lookup_command(&config, &code).await {
                eprintln!("{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
        Some(Commands::Ocr { image }) => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            if let Err(e) = run_ocr_command(&config, &image).await {
                eprintln!("{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
        Some(Commands::Say { text }) => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            run_say_command(&config, &text).await?;
        }
        Some(Commands::Check) => {
            let config = load_config(cli.config.as_deref(), cli.device)?;
            if !check_dependencies(&config.camera.device) {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref(), cli.device)?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "shopassist",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load config from file (custom or default), then env, then CLI overrides.
fn load_config(custom_path: Option<&Path>, device: Option<String>) -> Result<Config> {
    let mut config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    }
    .with_env_overrides();

    if let Some(device) = device {
        config.camera.device = device;
    }

    config.validate()?;
    Ok(config)
}

/// Handle configuration inspection commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&Path>,
    device: Option<String>,
) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config(custom_path, device)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let config = load_config(custom_path, device)?;
            match config.get_value_by_path(&key) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}

/// Send IPC command to daemon and handle response.
async fn handle_ipc_command(socket: Option<PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    match send_command(&socket_path, command).await {
        Ok(response) => match response {
            Response::Ok => println!("{}", "OK".green()),
            Response::Recognized { text } => println!("{}", text),
            Response::Status {
                camera,
                scanner_running,
                scan_armed,
                product_name,
                ocr_text,
                image_path,
            } => {
                println!("Status:");
                println!("  {}     {:?}", "Camera:".dimmed(), camera);
                println!(
                    "  {}    {}",
                    "Scanner:".dimmed(),
                    match (scanner_running, scan_armed) {
                        (false, _) => "stopped",
                        (true, true) => "waiting for a barcode",
                        (true, false) => "holding last barcode",
                    }
                );
                println!("  {}    {}", "Product:".dimmed(), product_name);
                if let Some(text) = ocr_text {
                    println!("  {}        {}", "OCR:".dimmed(), text.replace('\n', " / "));
                }
                if let Some(path) = image_path {
                    println!("  {}      {}", "Photo:".dimmed(), path);
                }
            }
            Response::Error { message } => {
                eprintln!("{}", format!("Error: {}", message).red());
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!(
                "{}",
                format!("Failed to communicate with daemon: {}", e).red()
            );
            eprintln!("Is the daemon running? Start it with: shopassist daemon");
            std::process::exit(1);
        }
    }

    Ok(())
}
