use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    hanzi_reader::logging::init("info").context("init logging")?;

    let cli = hanzi_reader::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        hanzi_reader::cli::Command::Scrape(args) => {
            let config = hanzi_reader::config::ScrapeConfig::from_args(&args)
                .context("invalid configuration")?;
            let summary = hanzi_reader::scrape::run(config).await.context("scrape")?;
            print!("{summary}");
        }
        hanzi_reader::cli::Command::Show(args) => {
            let text = hanzi_reader::scrape::show(&args.output_dir, args.id)
                .await
                .context("show")?;
            println!("{text}");
        }
    }

    Ok(())
}
