use std::{env, path::Path, time::Duration};

const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng -v {lang} -s {wpm}";
const DEFAULT_TYPING_DELAY_MS: u64 = 15;

/// Load `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Get the environment variable, falling back to `T::default()`.
pub fn get_env<T: std::str::FromStr + Default>(key: &str) -> T {
    get_env_or(key, T::default())
}

/// Get the environment variable, falling back to `default` when it is unset
/// or does not parse.
pub fn get_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(s) if !s.trim().is_empty() => match s.trim().parse() {
            Ok(val) => val,
            Err(_) => {
                tracing::error!("Error parsing {}", key);
                default
            }
        },
        _ => default,
    }
}

/// Front-end settings that are not part of the client config.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Command line used to speak replies. `{lang}` and `{wpm}` are expanded
    /// and the reply text is appended as the last argument.
    pub speech_command: String,
    /// Per-character delay of the typewriter used for non-streamed answers.
    pub typing_delay: Duration,
}

impl Settings {
    pub fn load() -> Self {
        let speech_command: String = get_env("SPART_SPEECH_COMMAND");
        Self {
            speech_command: if speech_command.trim().is_empty() {
                DEFAULT_SPEECH_COMMAND.to_string()
            } else {
                speech_command
            },
            typing_delay: Duration::from_millis(get_env_or(
                "SPART_TYPING_DELAY_MS",
                DEFAULT_TYPING_DELAY_MS,
            )),
        }
    }
}
