//! Configuration snapshots
//!
//! A snapshot has three sections: general timing/scale, per-effect parameter
//! sets keyed by effect type, and overlay entries keyed by overlay type.
//! Every field is optional so a partial snapshot is a valid patch; whatever
//! is missing keeps its previous value when applied.

use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG_JSON: &str = include_str!("../config.json");

/// Overlay type that drives the text scroller
pub const TICKER_OVERLAY: &str = "tickertext";

/// Shortest transition the engine will run, in seconds
pub const MIN_TRANSITION_SECS: f32 = 0.05;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralConfig {
    /// Milliseconds each effect stays on screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_duration: Option<f64>,
    /// Milliseconds a transition takes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_scale: Option<f32>,
}

impl GeneralConfig {
    /// Effect duration in seconds, if present and sane
    pub fn effect_secs(&self) -> Option<f32> {
        millis_to_secs(self.effect_duration)
    }

    /// Transition duration in seconds, if present and sane
    pub fn transition_secs(&self) -> Option<f32> {
        millis_to_secs(self.transition_duration).map(|s| s.max(MIN_TRANSITION_SECS))
    }

    /// Resolution scale, if present, clamped into (0, 1]
    pub fn scale(&self) -> Option<f32> {
        self.resolution_scale
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| s.min(1.0))
    }
}

fn millis_to_secs(ms: Option<f64>) -> Option<f32> {
    ms.filter(|v| v.is_finite() && *v >= 0.0).map(|v| (v / 1000.0) as f32)
}

/// Named effect parameters, read by name and only when numeric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectParams(Map<String, Value>);

impl EffectParams {
    /// A finite number under `key`; anything else reads as absent
    pub fn number(&self, key: &str) -> Option<f32> {
        self.0
            .get(key)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
    }

    /// Integer parameter, truncated and clamped to `min..=max`
    pub fn count(&self, key: &str, min: usize, max: usize) -> Option<usize> {
        self.number(key).map(|v| (v.max(0.0) as usize).clamp(min, max))
    }

    pub fn set(&mut self, key: &str, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.0.insert(key.to_string(), Value::Number(n));
        }
    }
}

impl<const N: usize> From<[(&str, f64); N]> for EffectParams {
    fn from(pairs: [(&str, f64); N]) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.set(key, value);
        }
        params
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: EffectParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// One configuration snapshot as delivered by a config source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub general: GeneralConfig,
    pub overlays: Vec<OverlayConfig>,
    pub effects: Vec<EffectConfig>,
}

impl RemoteConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing configuration JSON")
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    /// The snapshot compiled into the binary
    pub fn builtin() -> Self {
        Self::from_json(DEFAULT_CONFIG_JSON).unwrap_or_else(|e| {
            warn!("Built-in configuration unusable ({:#}), using empty defaults", e);
            Self::default()
        })
    }

    /// Serialized form used to decide whether a snapshot changed
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Enabled effect entries in list order
    pub fn enabled_effects(&self) -> impl Iterator<Item = &EffectConfig> {
        self.effects.iter().filter(|e| e.enabled)
    }

    /// Parameters for an effect type
    ///
    /// With duplicate entries the last enabled one wins; a type listed only
    /// as disabled still yields its last entry.
    pub fn effect_params(&self, kind: &str) -> Option<&EffectParams> {
        let mut entries = self.effects.iter().rev().filter(|e| e.kind == kind);
        let last = entries.clone().next();
        entries.find(|e| e.enabled).or(last).map(|e| &e.params)
    }

    /// The first enabled ticker overlay, if any
    pub fn ticker(&self) -> Option<&OverlayConfig> {
        self.overlays
            .iter()
            .find(|o| o.kind == TICKER_OVERLAY && o.enabled)
    }
}

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSource {
    File,
    Mqtt,
}

/// Forwards a snapshot only when it differs from the last one its source sent
///
/// Sources are tracked separately: the file watcher re-delivering an
/// unchanged file must not undo a patch that arrived over MQTT.
pub struct ConfigManager {
    last_json: HashMap<ConfigSource, String>,
}

impl ConfigManager {
    /// `initial` counts as the file's first delivery
    pub fn new(initial: &RemoteConfig) -> Self {
        let mut last_json = HashMap::new();
        last_json.insert(ConfigSource::File, initial.fingerprint());
        Self { last_json }
    }

    /// `Some` when the candidate changed and should be hot-applied
    pub fn accept(&mut self, source: ConfigSource, candidate: RemoteConfig) -> Option<RemoteConfig> {
        let json = candidate.fingerprint();
        if self.last_json.get(&source) == Some(&json) {
            debug!("Configuration from {:?} unchanged", source);
            return None;
        }
        self.last_json.insert(source, json);
        Some(candidate)
    }
}

/// Re-reads a configuration file on an interval and forwards each parse
pub struct FileWatcher {
    stop: Arc<AtomicBool>,
    _thread: thread::JoinHandle<()>,
}

impl FileWatcher {
    pub fn spawn(
        path: PathBuf,
        interval: Duration,
        sender: Sender<(ConfigSource, RemoteConfig)>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || Self::watch_loop(&path, interval, &sender, &flag));
        Self {
            stop,
            _thread: handle,
        }
    }

    fn watch_loop(
        path: &Path,
        interval: Duration,
        sender: &Sender<(ConfigSource, RemoteConfig)>,
        stop: &AtomicBool,
    ) {
        info!("Watching {} every {:?}", path.display(), interval);
        let tick = Duration::from_millis(250);
        let mut waited = Duration::ZERO;
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(tick);
            waited += tick;
            if waited < interval {
                continue;
            }
            waited = Duration::ZERO;

            match RemoteConfig::load(path) {
                Ok(config) => {
                    if sender.send((ConfigSource::File, config)).is_err() {
                        // Frame loop gone
                        break;
                    }
                },
                Err(e) => warn!("Config reload failed: {:#}", e),
            }
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
