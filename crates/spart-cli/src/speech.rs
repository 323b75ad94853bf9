use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use spart_chat::{SpeechError, SpeechSynthesizer, Utterance};

/// Words per minute at rate `1.0` for engines that take a wpm argument.
const BASE_WPM: f32 = 175.0;

/// Speaks through an external TTS program such as `espeak-ng`.
///
/// Each utterance runs as a child process; cancelling kills it.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandSynthesizer {
    /// Parses a whitespace separated command line. `{lang}` and `{wpm}`
    /// placeholders are expanded per utterance.
    pub fn from_command_line(line: &str) -> Result<Self, SpeechError> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SpeechError::Unavailable("empty speech command".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            child: Mutex::new(None),
        })
    }

    fn expand_args(&self, utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_WPM * utterance.rate).round().max(1.0) as u32;
        let lang = utterance.lang.to_ascii_lowercase();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{lang}", &lang)
                    .replace("{wpm}", &wpm.to_string())
            })
            .collect();
        args.push(utterance.text.clone());
        args
    }

    /// Waits on a child that already exited on its own. Returns true while
    /// one is still running.
    pub fn reap_finished(&self) -> bool {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        let exited = match slot.as_mut() {
            Some(child) => !matches!(child.try_wait(), Ok(None)),
            None => return false,
        };
        if exited {
            *slot = None;
        }
        !exited
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        let child = Command::new(&self.program)
            .args(self.expand_args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Spawn(format!("{}: {e}", self.program)))?;
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut previous) = slot.replace(child)
            && matches!(previous.try_wait(), Ok(None))
        {
            let _ = previous.kill();
            let _ = previous.wait();
        }
        Ok(())
    }

    fn cancel(&self) {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = slot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_placeholders_and_appends_text() {
        let synth = CommandSynthesizer::from_command_line("espeak-ng -v {lang} -s {wpm}")
            .expect("command");
        let args = synth.expand_args(&Utterance::new("Olá").rate(1.2));
        assert_eq!(args, vec!["-v", "pt-br", "-s", "210", "Olá"]);
    }

    #[test]
    fn empty_command_is_unavailable() {
        assert!(matches!(
            CommandSynthesizer::from_command_line("   "),
            Err(SpeechError::Unavailable(_))
        ));
    }

    #[test]
    fn finished_child_is_reaped() {
        let synth = CommandSynthesizer::from_command_line("true").expect("command");
        synth.speak(&Utterance::new("oi")).expect("spawn");
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while synth.reap_finished() {
            assert!(std::time::Instant::now() < deadline, "child never exited");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(synth.child.lock().expect("child lock").is_none());
        assert!(!synth.reap_finished());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let synth = CommandSynthesizer::from_command_line("spart-no-such-tts-binary")
            .expect("command");
        assert!(matches!(
            synth.speak(&Utterance::new("oi")),
            Err(SpeechError::Spawn(_))
        ));
        synth.cancel();
    }
}
