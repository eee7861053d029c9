use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use oem_notify::config::{ConfigFormat, ConfigStore};
use oem_notify::error::Error;
use oem_notify::event::EventContext;
use oem_notify::logging;
use oem_notify::notifier::Notifier;
use oem_notify::runtime;
use oem_notify::transport::{DryRunTransport, SmtpMailer, Transport};

/// Send an email notification for the Enterprise Manager event described
/// by the environment (EVENT_NAME, SEVERITY, TARGET_NAME, TARGET_TYPE,
/// LIFECYCLE_STATUS, MESSAGE).
#[derive(Parser)]
#[command(name = "oem-notify")]
#[command(version)]
#[command(about = "Rule-driven email notifications for Enterprise Manager events", long_about = None)]
struct Cli {
    /// Configuration file (.yaml/.yml or .ini). Defaults to
    /// config/oemnotification.yaml beside the binary.
    #[arg(short, long, value_name = "FILE", env = "OEM_NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Evaluate rules and print the message instead of sending it.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config_path = cli.config.unwrap_or_else(ConfigStore::default_path);

    let config = match ConfigStore::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logging::init_fallback();
            tracing::error!("Critical error: {e}");
            return ExitCode::from(Error::from(e).exit_code());
        }
    };

    let _log_guard = match logging::init(&config.debug) {
        Ok(guard) => guard,
        Err(e) => {
            logging::init_fallback();
            tracing::error!("Critical error: {e}");
            return ExitCode::from(Error::from(e).exit_code());
        }
    };

    tracing::debug!(
        path = %config_path.display(),
        format = ConfigFormat::from_path(&config_path)
            .map(|f| f.loader().name())
            .unwrap_or("unknown"),
        mode = %config.evaluation_mode,
        rules = config.rules.len(),
        "Loaded configuration"
    );

    let event = EventContext::from_env();

    let transport: Box<dyn Transport> = if cli.dry_run {
        Box::new(DryRunTransport)
    } else {
        Box::new(SmtpMailer::new(config.smtp.clone()))
    };

    let notifier = Notifier::new(&config, transport.as_ref());
    match runtime::block_on(notifier.notify(&event)) {
        Ok(Ok(_)) => ExitCode::SUCCESS,
        // Already logged with context by the notifier.
        Ok(Err(e)) => {
            tracing::debug!(exit_code = e.exit_code(), "Notification failed");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            tracing::error!("Critical error: failed to start async runtime: {e}");
            ExitCode::FAILURE
        }
    }
}
