//! Console voice assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (writes the defaults on first run).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Build the event channel and every adapter that posts into it.
//! 5. Spawn the hotkey listener thread.
//! 6. Run the [`ControllerRunner`] until Ctrl-C.
//!
//! Recognition results are read from stdin, one utterance per line.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use wake_session::{
    config::AppConfig,
    controller::{Collaborators, ControllerEvent, ControllerRunner, TokioScheduler, WakeController},
    dispatch::{ApiChat, ChatCommandSink, CommandSink, LogCommandSink},
    feedback::{Feedback, LogNotifier, LogSynthesizer},
    hotkey::{HotkeyBindings, HotkeyListener},
    permission::CpalMicrophone,
    recognition::ConsoleRecognizer,
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("wake-session starting up");

    // 2. Configuration
    let config = AppConfig::load_or_create().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Channel + adapters
    let (events_tx, events_rx) = mpsc::unbounded_channel::<ControllerEvent>();

    let engine = ConsoleRecognizer::spawn(events_tx.clone())
        .context("failed to start console recognizer")?;

    let feedback = Feedback::new(
        Arc::new(LogSynthesizer::new(events_tx.clone())),
        Arc::new(LogNotifier),
        config.feedback.clone(),
    );

    let commands: Arc<dyn CommandSink> = if config.chat.enabled {
        log::info!("chat enabled: {} ({})", config.chat.base_url, config.chat.model);
        Arc::new(ChatCommandSink::new(
            Arc::new(ApiChat::from_config(&config.chat)),
            events_tx.clone(),
        ))
    } else {
        Arc::new(LogCommandSink)
    };

    let controller = WakeController::new(
        &config,
        Collaborators {
            engine: Box::new(engine),
            microphone: Box::new(CpalMicrophone::new()),
            scheduler: Box::new(TokioScheduler::new(events_tx.clone())),
            feedback,
            commands,
        },
    );

    // 5. Hotkeys (optional: may fail without a display server)
    let _hotkeys = match HotkeyListener::start(
        HotkeyBindings::from_config(&config.hotkey),
        events_tx.clone(),
    ) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("Hotkey listener unavailable: {e}");
            None
        }
    };

    // 6. Ctrl-C → Shutdown
    {
        let events_tx = events_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = events_tx.send(ControllerEvent::Shutdown);
            }
        });
    }

    println!("Say \"hey joy\" to wake me.  /capture records a command, /sleep ends the session, /quit exits.");
    ControllerRunner::new(controller).run(events_rx).await;
    Ok(())
}
