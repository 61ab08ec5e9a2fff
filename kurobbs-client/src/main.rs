use log::{debug, error, info};

use kurobbs_shared::ROOT_URL;

use std::process::ExitCode;

mod error;
mod logging;
mod notify;
mod settings;
#[cfg(test)]
mod testing;
mod workflow;

use error::Result;
use notify::Notifier;
use settings::Settings;
use workflow::KurobbsClient;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            // Nothing to redact yet, but the failure still goes through the log.
            let _ = logging::init(false, Vec::<String>::new());
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(settings.debug, settings.sensitive_values()) {
        eprintln!("Failed to install logger: {}", e);
        return ExitCode::FAILURE;
    }
    let notifier = match Notifier::from_settings(&settings) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("Failed to build notification client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&settings, &notifier, ROOT_URL).await;
    if let Err(e) = &result {
        error!("{}", e);
        notify(&notifier, &e.to_string()).await;
    }
    ExitCode::from(exit_status(&result))
}

/// Notification outcomes never reach this; only the run itself decides.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Runs both actions and pushes the summary of whatever succeeded. Recorded
/// failures come back as a single aggregate error.
async fn run(settings: &Settings, notifier: &Notifier, root_url: &str) -> Result<()> {
    let client = KurobbsClient::new(&settings.token, root_url)?;
    let ledger = client.run().await?;
    debug!(
        "{} action(s) succeeded, {} failed",
        ledger.successes().len(),
        ledger.failures().len()
    );
    if let Some(summary) = ledger.summary() {
        info!("{}", summary);
        notify(notifier, &summary).await;
    }
    ledger.into_result()
}

async fn notify(notifier: &Notifier, message: &str) {
    let dispatch = notifier.send(message).await;
    debug!(
        "Notification delivered on {}/{} channel(s)",
        dispatch.delivered, dispatch.attempted
    );
}
