//! Text-to-speech playback of replies.
//!
//! The speech engine itself is external; [`Narrator`] only guarantees that at
//! most one utterance plays at a time.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::SpeechError;

const DEFAULT_LANG: &str = "pt-BR";
const DEFAULT_RATE: f32 = 0.9;

/// A single speech playback request.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// BCP 47 language tag.
    pub lang: String,
    /// Playback rate where `1.0` is the engine's normal speed.
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: DEFAULT_LANG.to_string(),
            rate: DEFAULT_RATE,
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }
}

/// Speech engine capability.
///
/// `speak` starts playback and returns without waiting for it to end.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Stops whatever is currently playing. Must be a no-op when idle.
    fn cancel(&self);
}

/// Coordinates playback so only one utterance is active.
#[derive(Clone)]
pub struct Narrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    lang: String,
    rate: f32,
    current: Arc<Mutex<Option<Utterance>>>,
}

impl Narrator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            lang: DEFAULT_LANG.to_string(),
            rate: DEFAULT_RATE,
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Speaks `text`, cancelling any utterance that is still in flight.
    pub fn narrate(&self, text: &str) -> Result<(), SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let utterance = Utterance::new(text).lang(&self.lang).rate(self.rate);
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current.take().is_some() {
            debug!("cancelling previous utterance");
            self.synthesizer.cancel();
        }
        self.synthesizer.speak(&utterance)?;
        debug!(chars = utterance.text.chars().count(), lang = %utterance.lang, "utterance started");
        *current = Some(utterance);
        Ok(())
    }

    /// Stops the current utterance, if one was started.
    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current.take().is_some() {
            self.synthesizer.cancel();
        }
    }

    /// Returns true while an utterance started by this narrator has not been
    /// stopped or replaced.
    pub fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .map(|c| c.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }
}
