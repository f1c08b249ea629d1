mod cli;
mod commands;
mod error;
mod mcp;
mod output;
mod page_range;
mod pdf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::compress::CompressRequest;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli::init_logging(cli.log_level.as_deref()) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }

    if let Err(err) = dispatch(cli.command).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Mcp { ghostscript } => {
            mcp::run_server(ghostscript).await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Split {
            input,
            output_dir,
            ranges,
            overwrite,
        } => {
            let written = commands::split::run(&input, &output_dir, ranges.as_deref(), overwrite)?;
            for path in &written {
                println!("{}", path.display());
            }
            println!("Wrote {} file(s) to {}", written.len(), output_dir.display());
        }
        Commands::Merge { input_dir, output } => {
            let summary = commands::merge::run(&input_dir, &output)?;
            if summary.skipped > 0 {
                println!("Skipped {} unsupported file(s)", summary.skipped);
            }
            println!(
                "Merged {} file(s) ({} pages) into {}",
                summary.sources,
                summary.pages,
                output.display()
            );
        }
        Commands::Compress {
            input,
            output,
            level,
            force,
            list_levels,
            ghostscript,
        } => {
            if list_levels {
                commands::compress::list_levels();
                return Ok(());
            }
            let Some(input) = input else {
                anyhow::bail!("an input file is required");
            };
            let request = CompressRequest {
                input,
                output,
                level,
                force,
            };
            commands::compress::run(&request, &ghostscript)?;
        }
    }

    Ok(())
}
