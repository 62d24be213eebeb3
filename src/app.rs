//! Shopping assistant entry points.
//!
//! Wires the real capabilities (Open Food Facts, tesseract, espeak-ng,
//! zbarcam, ffmpeg) into a session and drives it from the terminal.

use crate::camera::CameraController;
use crate::catalog::{OpenFoodFacts, ProductCatalog};
use crate::config::{Config, SpeechConfig};
use crate::defaults;
use crate::error::{Result, ShopAssistError};
use crate::exec::SystemCommandExecutor;
use crate::ocr::{TesseractRecognizer, TextRecognizer, join_blocks};
use crate::output;
use crate::session::{Session, SessionUpdate, spawn_session};
use crate::speech::{
    self, Announcer, EspeakEngine, GlobalAnnouncer, Speech, SpeechEngine, VoiceSettings,
};
use crossbeam_channel::Receiver;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Scan,
    Recognize,
    Grant,
    Status,
    Quit,
}

/// Map a prompt line to an action.
pub fn parse_action(line: &str) -> Option<Action> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "scan" => Some(Action::Scan),
        "r" | "recognize" => Some(Action::Recognize),
        "g" | "grant" => Some(Action::Grant),
        "?" | "status" => Some(Action::Status),
        "q" | "quit" | "exit" => Some(Action::Quit),
        _ => None,
    }
}

pub fn voice_settings(config: &SpeechConfig) -> VoiceSettings {
    VoiceSettings {
        locale: config.locale.clone(),
        rate: config.rate,
    }
}

fn speech_engine() -> Arc<dyn SpeechEngine> {
    Arc::new(EspeakEngine::new(SystemCommandExecutor::new()))
}

fn recognizer(config: &Config) -> Arc<dyn TextRecognizer> {
    Arc::new(TesseractRecognizer::new(
        SystemCommandExecutor::new(),
        config.ocr.language.clone(),
    ))
}

fn catalog(config: &Config) -> Result<Arc<dyn ProductCatalog>> {
    Ok(Arc::new(OpenFoodFacts::new(config.catalog.base_url.clone())?))
}

/// Install the process-wide announcer from config.
pub fn install_announcer(config: &SpeechConfig) -> Result<&'static Announcer> {
    speech::install(voice_settings(config), speech_engine())
}

/// Session over the real capabilities, speaking through the global announcer.
///
/// No camera is bound; that is the [`CameraController`]'s job once access
/// is granted.
pub fn build_session(config: &Config) -> Result<Session> {
    Ok(Session::new(
        catalog(config)?,
        recognizer(config),
        Arc::new(GlobalAnnouncer),
    ))
}

/// Render session updates on a dedicated thread until every sender is gone.
pub fn spawn_renderer(rx: Receiver<SessionUpdate>) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("shopassist-render".to_string())
        .spawn(move || {
            for update in rx.iter() {
                output::render_update(&update);
            }
        })
        .map_err(ShopAssistError::from)
}

/// Drive `work` to completion unless `interrupt` resolves first.
pub async fn unless_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future,
) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        _ = interrupt => None,
    }
}

/// Run the interactive session until `q`, end of input or Ctrl+C.
pub async fn run_interactive(config: Config) -> Result<()> {
    install_announcer(&config.speech)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let renderer = spawn_renderer(rx)?;
    let (handle, task) = spawn_session(build_session(&config)?.with_update_sender(tx));
    let camera = CameraController::system(&config.camera);

    output::render_header(camera.device());
    let access = camera.start(&handle).await?;
    output::render_access(access, camera.device());
    output::render_actions(access);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = false;
    loop {
        let Some(line) = unless_interrupted(lines.next_line(), tokio::signal::ctrl_c())
            .await
            .transpose()?
            .flatten()
        else {
            break;
        };
        let access = camera.access().await;

        match parse_action(&line) {
            Some(Action::Quit) => break,
            Some(Action::Scan) if access.is_granted() => handle.rescan().await?,
            Some(Action::Recognize) if access.is_granted() => {
                match unless_interrupted(handle.recognize(), tokio::signal::ctrl_c()).await {
                    Some(Ok(_)) => {}
                    // The session has already raised the alert.
                    Some(Err(e)) => tracing::debug!(error = %e, "recognition failed"),
                    None => {
                        interrupted = true;
                        break;
                    }
                }
            }
            Some(Action::Scan | Action::Recognize) => {
                output::render_access(access, camera.device());
                output::render_actions(access);
            }
            Some(Action::Grant) => {
                let access = camera.retry(&handle).await?;
                output::render_access(access, camera.device());
                output::render_actions(access);
            }
            Some(Action::Status) => {
                let (state, _) = handle.snapshot().await?;
                output::render_access(access, camera.device());
                output::render_panels(&state);
            }
            None => output::render_actions(access),
        }
    }

    if interrupted {
        task.abort();
    }
    camera.stop().await;
    handle.shutdown().await;
    drop(handle);
    match task.await {
        Ok(session) => drop(session),
        Err(e) if e.is_cancelled() => tracing::debug!("recognition cancelled"),
        Err(e) => return Err(ShopAssistError::Other(format!("session task failed: {e}"))),
    }

    if renderer.join().is_err() {
        tracing::error!("renderer thread panicked");
    }
    Ok(())
}

/// Look a code up once, print the name and announce it.
///
/// Errors still print and announce the placeholder before being returned.
pub async fn run_lookup_command(config: &Config, code: &str) -> Result<String> {
    let announcer = Arc::new(Announcer::start(
        voice_settings(&config.speech),
        speech_engine(),
    )?);
    let mut session = Session::new(catalog(config)?, recognizer(config), announcer.clone());

    let result = session.lookup(code).await;
    println!("{}", output::format_product_panel(&session.state().product_name));

    drop(session);
    finish_announcer(announcer);
    result
}

/// Recognize text in an existing image, print it and read it aloud.
pub async fn run_ocr_command(config: &Config, image: &Path) -> Result<String> {
    let announcer = Announcer::start(voice_settings(&config.speech), speech_engine())?;

    let text = match recognizer(config).recognize(image).await {
        Ok(blocks) => match join_blocks(&blocks) {
            Some(text) => {
                announcer.say(&defaults::recognized_phrase(&text));
                text
            }
            None => {
                announcer.say(defaults::NO_TEXT_DETECTED);
                defaults::NO_TEXT_DETECTED.to_string()
            }
        },
        Err(e) => {
            announcer.finish();
            return Err(e);
        }
    };

    println!("{}", output::format_ocr_panel(Some(&text)));
    announcer.finish();
    Ok(text)
}

/// Speak a phrase with the configured voice and wait for playback.
pub async fn run_say_command(config: &Config, text: &str) -> Result<()> {
    let voice = voice_settings(&config.speech);
    speech_engine().speak(&voice, text).await
}

fn finish_announcer(announcer: Arc<Announcer>) {
    match Arc::try_unwrap(announcer) {
        Ok(announcer) => announcer.finish(),
        Err(_) => tracing::warn!("announcer still shared; queued phrases may be cut off"),
    }
}
