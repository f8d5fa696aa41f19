//! Application-level configuration loading: timing knobs, the default game
//! type, and the buzz-in question catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::games::{GameType, catalog, catalog::Question};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_NIGHT_BACK_CONFIG_PATH";

/// How long an empty room is preserved before destruction.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);
/// How long a buzzed-in player has before the auto-judgment fires.
const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Question catalog available to the buzz-in game.
    pub questions: Vec<Question>,
    /// Grace period before an empty room is purged.
    pub room_grace_period: Duration,
    /// Answer window after a buzz before the timeout auto-judgment.
    pub answer_timeout: Duration,
    /// Game type used when neither the request nor the room names one.
    pub default_game_type: GameType,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions: catalog::default_catalog(),
            room_grace_period: DEFAULT_GRACE_PERIOD,
            answer_timeout: DEFAULT_ANSWER_TIMEOUT,
            default_game_type: GameType::Reflex,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is absent or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = config.questions.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

/// On-disk configuration shape; every field is optional.
#[derive(Debug, Deserialize)]
struct RawConfig {
    questions: Option<Vec<Question>>,
    room_grace_period_secs: Option<u64>,
    answer_timeout_secs: Option<u64>,
    default_game_type: Option<GameType>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            questions: raw.questions.unwrap_or(defaults.questions),
            room_grace_period: raw
                .room_grace_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_grace_period),
            answer_timeout: raw
                .answer_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.answer_timeout),
            default_game_type: raw.default_game_type.unwrap_or(defaults.default_game_type),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
