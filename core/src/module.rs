//! Per-module state shared by the insync and music handles

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::{resolve_path, ConfigError, ModuleConfig, Palette, SetOption, Settings};
use crate::monitor::{take_changed, ConfigMonitor, MonitorError};

/// Configuration of one module plus the machinery to keep it current
///
/// Options set by the host are remembered and re-applied on top of the
/// file whenever it is reloaded.
pub struct ModuleState<C> {
    pub palette: Palette,
    pub config: C,
    config_path: Option<PathBuf>,
    overrides: Vec<(String, String)>,
    monitor: Option<ConfigMonitor>,
    config_changed: Arc<Mutex<bool>>,
}

/// Module options first, then the shared palette
fn apply_option<C: SetOption>(
    palette: &mut Palette,
    config: &mut C,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match config.set_option(key, value) {
        Err(ConfigError::UnknownKey(_)) => palette.set_option(key, value),
        other => other,
    }
}

impl<C: ModuleConfig> ModuleState<C> {
    pub fn new() -> Self {
        ModuleState {
            palette: Palette::default(),
            config: C::default(),
            config_path: None,
            overrides: Vec::new(),
            monitor: None,
            config_changed: Arc::new(Mutex::new(false)),
        }
    }

    fn apply(&mut self, settings: Settings) -> Result<(), ConfigError> {
        let mut palette = settings.palette.clone();
        let mut config = C::from_settings(settings);
        for (key, value) in &self.overrides {
            apply_option(&mut palette, &mut config, key, value)?;
        }
        self.palette = palette;
        self.config = config;
        Ok(())
    }

    /// Load the config file; `None` means the default location
    pub fn load_config(&mut self, path: Option<&str>) -> Result<(), ConfigError> {
        let path = resolve_path(path);
        let settings = Settings::load_from(&path)?;
        self.apply(settings)?;
        self.config_path = Some(path);
        Ok(())
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        apply_option(&mut self.palette, &mut self.config, key, value)?;
        self.overrides.retain(|(k, _)| k != key);
        self.overrides.push((key.to_string(), value.to_string()));
        Ok(())
    }

    /// Watch the config file for changes
    ///
    /// Without an explicit path, watches the file last loaded, or the
    /// default location.
    pub fn start_monitor(&mut self, path: Option<&str>) -> Result<(), MonitorError> {
        // Stop existing monitor
        self.monitor = None;

        let path = match (path, &self.config_path) {
            (None, Some(loaded)) => loaded.clone(),
            (path, _) => resolve_path(path),
        };

        let changed_flag = Arc::clone(&self.config_changed);
        self.monitor = Some(ConfigMonitor::new(&path, changed_flag)?);
        self.config_path = Some(path);
        Ok(())
    }

    pub fn stop_monitor(&mut self) {
        self.monitor = None;
    }

    /// Reload the config file if the monitor saw it change
    ///
    /// A file that fails to load leaves the current configuration in place.
    pub fn refresh(&mut self) {
        if !take_changed(&self.config_changed) {
            return;
        }
        let Some(path) = self.config_path.clone() else {
            return;
        };

        match Settings::load_from(&path).and_then(|settings| self.apply(settings)) {
            Ok(()) => tracing::info!(path = %path.display(), "config reloaded"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "config reload failed"),
        }
    }
}

#[cfg(test)]
impl<C> ModuleState<C> {
    /// Act as if the monitor had seen the file change
    pub(crate) fn mark_changed(&self) {
        *self.config_changed.lock().unwrap() = true;
    }
}

impl<C: ModuleConfig> Default for ModuleState<C> {
    fn default() -> Self {
        Self::new()
    }
}
