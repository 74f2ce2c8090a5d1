use crate::logging::{LogConfig, LogLevel};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pier",
    about = "Supervise debug tunnels into running workloads",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "PIER_LOG_LEVEL",
        default_value_t = LogLevel::Info,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "PIER_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Work with the debug process of the target workload
    #[command(subcommand)]
    Debug(DebugCommand),
}

#[derive(Subcommand, Debug)]
pub enum DebugCommand {
    /// Forward a local port to the debug port of the target workload
    #[command(
        name = "port-forward",
        long_about = "Forward a local port to the remote port the target workload's debug \
                      process listens on.\n\nBy default the local and remote port are the \
                      same. Use --local-port to listen elsewhere; the remote port comes from \
                      the workspace configuration ([debug] port)."
    )]
    PortForward(PortForwardArgs),

    /// Show the active debug session for the target workload
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct PortForwardArgs {
    #[arg(
        long = "local-port",
        short = 'l',
        value_name = "PORT",
        help = "Local port to listen on (defaults to the well-known debug port 5858)"
    )]
    pub local_port: Option<u16>,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    #[arg(
        long = "context",
        value_name = "DIR",
        env = "PIER_CONTEXT",
        help = "Workspace directory holding the target configuration (defaults to the current directory)"
    )]
    pub context: Option<PathBuf>,
}

impl ContextArgs {
    pub fn resolve(&self) -> PathBuf {
        self.context.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_port_is_unpinned_by_default() {
        let cli = Cli::try_parse_from(["pier", "debug", "port-forward"]).expect("parse");
        let Command::Debug(DebugCommand::PortForward(args)) = cli.command else {
            panic!("expected port-forward");
        };
        assert_eq!(args.local_port, None);
    }

    #[test]
    fn local_port_flag_pins_the_port() {
        let cli = Cli::try_parse_from(["pier", "debug", "port-forward", "-l", "9000"])
            .expect("parse");
        let Command::Debug(DebugCommand::PortForward(args)) = cli.command else {
            panic!("expected port-forward");
        };
        assert_eq!(args.local_port, Some(9000));
    }

    #[test]
    fn context_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["pier", "debug", "info"]).expect("parse");
        let Command::Debug(DebugCommand::Info(args)) = cli.command else {
            panic!("expected info");
        };
        assert_eq!(args.context.resolve(), PathBuf::from("."));
    }
}
