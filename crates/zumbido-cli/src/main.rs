//! zumbido CLI - inspect, author, and render `AUDI` chunks offline.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zumbido")]
#[command(author, version, about = "Tools for zumbido AUDI audio chunks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the contents of an AUDI chunk
    Info(commands::info::InfoArgs),

    /// Write a small demonstration patch
    Demo(commands::demo::DemoArgs),

    /// Render an AUDI chunk to a WAV file
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info(args) => commands::info::run(&args),
        Commands::Demo(args) => commands::demo::run(&args),
        Commands::Render(args) => commands::render::run(&args),
    }
}
