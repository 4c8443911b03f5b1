use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fontpress::cli::{Cli, Commands};
use fontpress::{FontService, janitor, logging};
use fontpress_config::Config;
use fontpress_mcp::{FacesForFamilyRequest, FontOverviewRequest, PublishFontRequest, ToolBackend};
use serde_json::Value;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig { force }) = &cli.command {
        let path = Config::init(cli.config.as_deref(), *force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    // CLI --log-level takes highest precedence, then FONTPRESS_LOG, then config.
    let env_level = std::env::var(logging::LOG_ENV_VAR).ok();
    let level = logging::resolve_level(
        cli.log_level.map(Into::into),
        env_level.as_deref(),
        config.logging.level,
    );
    logging::init_log_bridge(level, config.log_file_path().as_deref())?;
    log::info!("Starting fontpress v{}", fontpress::VERSION);

    let runtime = Runtime::new()?;
    let result = runtime.block_on(run(cli.command.unwrap_or(Commands::Serve), config));

    // A wedged blocking stage must not hold the process open.
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    if let Err(ref e) = result {
        eprintln!("fontpress: error: {e:#}");
    }
    result
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let scratch_root = config.scratch_root();
    let sweep_limits = janitor::SweepLimits::from_config(&config.convert);
    let service = FontService::from_config(config)?;

    match command {
        Commands::Serve => {
            fontpress_mcp::set_app_version(fontpress::VERSION);
            let _janitor = janitor::spawn(scratch_root, sweep_limits);
            let service = Arc::new(service);
            let mut stdout = tokio::io::stdout();
            fontpress_mcp::serve(service, tokio::io::stdin(), &mut stdout).await?;
            log::info!("stdin closed, shutting down");
            Ok(())
        }
        Commands::Families => print_json(service.list_families().await),
        Commands::Faces { family } => {
            print_json(service.faces_for_family(FacesForFamilyRequest { family }).await)
        }
        Commands::Overview { post_script_name } => print_json(
            service
                .font_overview(FontOverviewRequest { post_script_name })
                .await,
        ),
        Commands::Publish(args) => {
            let arguments = args.to_arguments();
            let request = PublishFontRequest::from_arguments(Some(&arguments))
                .map_err(|e| anyhow::anyhow!("invalid arguments: {}", e.0))?;
            print_json(service.publish_font(request).await)
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn print_json(result: Result<Value, fontpress_mcp::ToolFailure>) -> Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", serde_json::to_string_pretty(&failure)?);
            Err(failure.into())
        }
    }
}
