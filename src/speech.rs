//! Speech announcer.
//!
//! One process-wide [`Announcer`] is installed at startup with a fixed
//! locale and rate. Callers enqueue phrases and move on; a worker thread
//! plays them one after another. Nothing reports back when playback ends.

use crate::defaults;
use crate::error::{Result, ShopAssistError};
use crate::exec::CommandExecutor;
use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;

/// Something phrases can be spoken through.
pub trait Speech: Send + Sync {
    /// Enqueue a phrase for playback.
    fn say(&self, phrase: &str);
}

/// Voice configuration, fixed for the lifetime of an announcer.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub locale: String,
    /// Normalized rate, 0.0 to 1.0.
    pub rate: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: defaults::SPEECH_LOCALE.to_string(),
            rate: defaults::SPEECH_RATE,
        }
    }
}

impl VoiceSettings {
    /// espeak voice name for the locale (`en-US` -> `en-us`).
    pub fn espeak_voice(&self) -> String {
        self.locale.replace('_', "-").to_ascii_lowercase()
    }

    /// espeak words-per-minute for the rate.
    pub fn words_per_minute(&self) -> u32 {
        (self.rate.clamp(0.0, 1.0) * defaults::MAX_WORDS_PER_MINUTE)
            .round()
            .max(80.0) as u32
    }
}

/// Synthesizes and plays one phrase to completion.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, voice: &VoiceSettings, phrase: &str) -> Result<()>;
}

/// Speech engine running `espeak-ng`.
pub struct EspeakEngine<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> EspeakEngine<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl<E: CommandExecutor> SpeechEngine for EspeakEngine<E> {
    async fn speak(&self, voice: &VoiceSettings, phrase: &str) -> Result<()> {
        let args = vec![
            "-v".to_string(),
            voice.espeak_voice(),
            "-s".to_string(),
            voice.words_per_minute().to_string(),
            "--".to_string(),
            phrase.to_string(),
        ];
        self.executor
            .execute("espeak-ng", &args)
            .await
            .map(|_| ())
            .map_err(|e| ShopAssistError::Speech {
                message: e.to_string(),
            })
    }
}

/// Queued announcer with a dedicated playback thread.
pub struct Announcer {
    voice: VoiceSettings,
    tx: Sender<String>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Announcer {
    /// Start the playback worker.
    pub fn start(voice: VoiceSettings, engine: Arc<dyn SpeechEngine>) -> Result<Self> {
        let (tx, rx) = unbounded::<String>();
        let worker_voice = voice.clone();
        let worker = std::thread::Builder::new()
            .name("shopassist-speech".to_string())
            .spawn(move || playback_loop(rx, worker_voice, engine))
            .map_err(|e| ShopAssistError::Speech {
                message: format!("failed to start speech worker: {e}"),
            })?;

        Ok(Self {
            voice,
            tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    /// Close the queue and wait until every queued phrase has played.
    pub fn finish(self) {
        let Self { tx, worker, .. } = self;
        drop(tx);
        if let Ok(mut guard) = worker.lock()
            && let Some(handle) = guard.take()
            && handle.join().is_err()
        {
            tracing::error!("speech worker panicked");
        }
    }
}

impl Speech for Announcer {
    fn say(&self, phrase: &str) {
        tracing::debug!(phrase, "announce");
        if self.tx.send(phrase.to_string()).is_err() {
            tracing::warn!(phrase, "speech worker stopped; phrase dropped");
        }
    }
}

fn playback_loop(rx: Receiver<String>, voice: VoiceSettings, engine: Arc<dyn SpeechEngine>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "speech worker could not build its runtime");
            return;
        }
    };

    for phrase in rx.iter() {
        if let Err(e) = runtime.block_on(engine.speak(&voice, &phrase)) {
            tracing::warn!(error = %e, "speech playback failed");
        }
    }
}

static ANNOUNCER: OnceLock<Announcer> = OnceLock::new();

/// Install the process-wide announcer.
///
/// The first call wins; later calls keep the original voice and log a
/// warning.
pub fn install(voice: VoiceSettings, engine: Arc<dyn SpeechEngine>) -> Result<&'static Announcer> {
    if let Some(existing) = ANNOUNCER.get() {
        if existing.voice != voice {
            tracing::warn!("announcer already configured; ignoring new voice settings");
        }
        return Ok(existing);
    }
    let announcer = Announcer::start(voice, engine)?;
    Ok(ANNOUNCER.get_or_init(|| announcer))
}

/// The installed announcer, if any.
pub fn global() -> Option<&'static Announcer> {
    ANNOUNCER.get()
}

/// `Speech` handle that forwards to the process-wide announcer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalAnnouncer;

impl Speech for GlobalAnnouncer {
    fn say(&self, phrase: &str) {
        match global() {
            Some(announcer) => announcer.say(phrase),
            None => tracing::warn!(phrase, "no announcer installed"),
        }
    }
}

/// Records phrases instead of speaking them.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    phrases: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phrases(&self) -> Vec<String> {
        self.phrases.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Speech for RecordingSpeech {
    fn say(&self, phrase: &str) {
        if let Ok(mut phrases) = self.phrases.lock() {
            phrases.push(phrase.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MockCommandExecutor;

    struct RecordingEngine {
        spoken: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SpeechEngine for RecordingEngine {
        async fn speak(&self, voice: &VoiceSettings, phrase: &str) -> Result<()> {
            self.spoken
                .lock()
                .unwrap()
                .push((voice.locale.clone(), phrase.to_string()));
            Ok(())
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl SpeechEngine for FailingEngine {
        async fn speak(&self, _voice: &VoiceSettings, _phrase: &str) -> Result<()> {
            Err(ShopAssistError::Speech {
                message: "no audio device".to_string(),
            })
        }
    }

    #[test]
    fn test_voice_mapping() {
        let voice = VoiceSettings::default();
        assert_eq!(voice.espeak_voice(), "en-us");
        assert_eq!(voice.words_per_minute(), 175);

        let fast = VoiceSettings {
            locale: "pt_BR".to_string(),
            rate: 1.0,
        };
        assert_eq!(fast.espeak_voice(), "pt-br");
        assert_eq!(fast.words_per_minute(), 350);

        let slow = VoiceSettings {
            locale: "en-GB".to_string(),
            rate: 0.0,
        };
        assert_eq!(slow.words_per_minute(), 80);
    }

    #[test]
    fn test_announcer_plays_phrases_in_order() {
        let engine = Arc::new(RecordingEngine {
            spoken: Mutex::new(Vec::new()),
        });
        let announcer = Announcer::start(VoiceSettings::default(), engine.clone()).unwrap();

        announcer.say("first");
        announcer.say("second");
        announcer.finish();

        let spoken = engine.spoken.lock().unwrap().clone();
        assert_eq!(
            spoken,
            vec![
                ("en-US".to_string(), "first".to_string()),
                ("en-US".to_string(), "second".to_string()),
            ]
        );
    }

    #[test]
    fn test_announcer_survives_engine_failures() {
        let announcer = Announcer::start(VoiceSettings::default(), Arc::new(FailingEngine)).unwrap();
        announcer.say("one");
        announcer.say("two");
        announcer.finish();
    }

    #[tokio::test]
    async fn test_espeak_engine_arguments() {
        let engine = EspeakEngine::new(MockCommandExecutor::new());
        engine
            .speak(&VoiceSettings::default(), "Product name is Acme Juice")
            .await
            .unwrap();

        let calls = engine.executor.calls();
        assert_eq!(calls[0].0, "espeak-ng");
        assert_eq!(
            calls[0].1,
            vec!["-v", "en-us", "-s", "175", "--", "Product name is Acme Juice"]
        );
    }

    #[tokio::test]
    async fn test_espeak_failure_maps_to_speech_error() {
        let executor = MockCommandExecutor::new().with_error(ShopAssistError::ToolNotFound {
            tool: "espeak-ng".to_string(),
        });
        let engine = EspeakEngine::new(executor);
        let err = engine
            .speak(&VoiceSettings::default(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopAssistError::Speech { .. }));
    }

    #[test]
    fn test_install_is_once() {
        let engine = Arc::new(RecordingEngine {
            spoken: Mutex::new(Vec::new()),
        });
        let first = install(VoiceSettings::default(), engine.clone()).unwrap();
        let second = install(
            VoiceSettings {
                locale: "de-DE".to_string(),
                rate: 0.9,
            },
            engine,
        )
        .unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.voice().locale, "en-US");
        assert!(global().is_some());
    }

    #[test]
    fn test_recording_speech() {
        let speech = RecordingSpeech::new();
        speech.say("No text detected.");
        assert_eq!(speech.phrases(), vec!["No text detected."]);
    }
}
