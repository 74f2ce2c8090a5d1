use crate::cli::InfoArgs;
use crate::config::WorkspaceConfig;
use crate::error::CliError;
use crate::store::SessionStore;
use time::format_description::well_known::Rfc3339;

/// Reports the recorded debug session for the resolved target, if any.
pub fn run(args: InfoArgs) -> Result<(), CliError> {
    let context = args.context.resolve();
    let config = WorkspaceConfig::load(&context)?;
    let store = SessionStore::open_default()?;

    match store.read(config.target())? {
        Some(record) => {
            let started = record
                .started_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Debug session active for {}", config.target());
            println!("  pair:    {}", record.pair);
            println!("  pid:     {}", record.pid);
            println!("  started: {started}");
        }
        None => {
            println!("No active debug session for {}", config.target());
        }
    }
    Ok(())
}
