use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use static_assertions::const_assert;
use tracing::{debug, info};

use crate::backend::retry::DEFAULT_RETRIES;
use crate::error::{Error, ErrorConversion, Result};

pub const DEFAULT_CONFIG_FILE: &str = "wake_warrior.toml";
pub const USER_ENV_VAR: &str = "WAKE_WARRIOR_USER";

const DEFAULT_GRID_SIZE: isize = 20;
const DEFAULT_INITIAL_INTERVAL_MS: u64 = 150;
const DEFAULT_INTERVAL_STEP_MS: u64 = 5;
const DEFAULT_MIN_INTERVAL_MS: u64 = 80;
const MAX_GRID_SIZE: isize = 200;

// the initial snake is 3 cells long and starts in the middle
const_assert!(DEFAULT_GRID_SIZE >= 6 && DEFAULT_GRID_SIZE <= MAX_GRID_SIZE);
const_assert!(DEFAULT_MIN_INTERVAL_MS <= DEFAULT_INITIAL_INTERVAL_MS);

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Prefs {
    /// Identity used when talking to the backend
    pub user: String,
    pub data_file: PathBuf,
    pub backend_retries: usize,

    pub wake: WakePrefs,
    pub snake: SnakePrefs,
    pub display: DisplayPrefs,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct WakePrefs {
    pub check_interval_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SnakePrefs {
    pub grid_size: isize,
    pub initial_interval_ms: u64,
    pub interval_step_ms: u64,
    pub min_interval_ms: u64,
    pub cell_size: f32,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DisplayPrefs {
    pub message_duration_ms: u64,
    pub show_fps: bool,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            user: "local".to_string(),
            data_file: PathBuf::from("wake_warrior.json"),
            backend_retries: DEFAULT_RETRIES,

            wake: WakePrefs::default(),
            snake: SnakePrefs::default(),
            display: DisplayPrefs::default(),
        }
    }
}

impl Default for WakePrefs {
    fn default() -> Self {
        Self { check_interval_secs: 60 }
    }
}

impl Default for SnakePrefs {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
            interval_step_ms: DEFAULT_INTERVAL_STEP_MS,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            cell_size: 24.,
        }
    }
}

impl Default for DisplayPrefs {
    fn default() -> Self {
        Self {
            message_duration_ms: 2000,
            show_fps: false,
        }
    }
}

impl WakePrefs {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }
}

impl DisplayPrefs {
    pub fn message_duration(&self) -> Duration {
        Duration::from_millis(self.message_duration_ms)
    }
}

impl Prefs {
    /// An explicit path must exist, otherwise the default file is
    /// read if present and built-in defaults are used if not
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut prefs = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                Self::default()
            }
        };

        if let Ok(user) = env::var(USER_ENV_VAR) {
            info!("{} set, acting as {:?}", USER_ENV_VAR, user);
            prefs.user = user;
        }
        Ok(prefs)
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("loading config from {}", path.display());
        let text = fs::read_to_string(path)
            .map_err(Error::from)
            .with_trace_step(format!("reading {}", path.display()))?;
        Self::parse(&text).with_trace_step(format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut prefs: Self = toml::from_str(text)?;
        prefs.snake.sanitize();
        Ok(prefs)
    }

    // builder
    pub fn user<S: ToString>(mut self, user: S) -> Self {
        self.user = user.to_string();
        self
    }
}

impl SnakePrefs {
    /// Clamp values that would break the game rather than reject the file
    fn sanitize(&mut self) {
        self.grid_size = self.grid_size.clamp(6, MAX_GRID_SIZE);
        self.min_interval_ms = self.min_interval_ms.max(1);
        self.initial_interval_ms = self.initial_interval_ms.max(self.min_interval_ms);
        // anything above this already hits the minimum after one bite
        self.interval_step_ms = self.interval_step_ms.min(self.initial_interval_ms);
        self.cell_size = self.cell_size.clamp(4., 64.);
    }
}

#[test]
fn test_partial_config() {
    let prefs = Prefs::parse(
        r#"
        user = "alice"

        [snake]
        grid_size = 30
        min_interval_ms = 200
        "#,
    )
    .unwrap();

    assert_eq!(prefs.user, "alice");
    assert_eq!(prefs.backend_retries, 1);
    assert_eq!(prefs.wake.check_interval_secs, 60);
    assert_eq!(prefs.snake.grid_size, 30);
    // initial interval is raised to the minimum
    assert_eq!(prefs.snake.initial_interval_ms, 200);
    assert_eq!(prefs.snake.interval_step_ms, DEFAULT_INTERVAL_STEP_MS);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let prefs = Prefs::parse(
        r#"
        [snake]
        grid_size = 1000000
        interval_step_ms = 9223372036854775807
        cell_size = 0.5
        "#,
    )
    .unwrap();

    assert_eq!(prefs.snake.grid_size, MAX_GRID_SIZE);
    assert_eq!(prefs.snake.interval_step_ms, DEFAULT_INITIAL_INTERVAL_MS);
    assert_eq!(prefs.snake.cell_size, 4.);
}

#[test]
fn test_bad_config() {
    assert!(Prefs::parse("snake = 3").is_err());
}
