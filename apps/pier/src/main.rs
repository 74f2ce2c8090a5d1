use pier::cli::{self, Cli, Command, DebugCommand};
use pier::error::CliError;
use pier::{debug, logging};

#[tokio::main]
async fn main() {
    let cli = cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    logging::init(&cli.logging.to_config())?;
    match cli.command {
        Command::Debug(DebugCommand::PortForward(args)) => debug::port_forward::run(args).await,
        Command::Debug(DebugCommand::Info(args)) => debug::info::run(args),
    }
}
