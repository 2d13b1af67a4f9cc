//! FFI boundary definitions for C interop

use chrono::Utc;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{ConfigError, InsyncConfig, MusicConfig};
use crate::module::ModuleState;
use crate::mpris::{PlayerError, PlayerLocator};
use crate::response::ModuleResponse;

/// Opaque handle to the insync module
pub struct StatusbarInsync {
    state: ModuleState<InsyncConfig>,
    last: ResponseStrings,
}

/// Opaque handle to the music module
pub struct StatusbarMusic {
    state: ModuleState<MusicConfig>,
    locator: PlayerLocator,
    last: ResponseStrings,
}

/// Strings handed to C, kept alive until the next poll of the same handle
#[derive(Default)]
struct ResponseStrings {
    full_text: CString,
    color: CString,
    json: CString,
}

/// Polling result returned to C
#[repr(C)]
pub struct CModuleResponse {
    /// Text to display (owned by Rust, valid until the next status call)
    pub full_text: *const c_char,
    /// Colour as `#rrggbb` (owned by Rust, valid until the next status call)
    pub color: *const c_char,
    /// Do not poll again before this Unix timestamp (seconds)
    pub cached_until: f64,
    /// Whether the data is valid
    pub valid: bool,
}

/// Result codes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CResultCode {
    Ok = 0,
    NullPointer = 1,
    InvalidArgument = 2,
    ConfigError = 3,
    NoPlayer = 4,
    PlayerError = 5,
    MonitorError = 6,
}

impl From<&ConfigError> for CResultCode {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::UnknownKey(_) | ConfigError::InvalidValue { .. } => {
                CResultCode::InvalidArgument
            }
            ConfigError::IoError(_) | ConfigError::ParseError(_) => CResultCode::ConfigError,
        }
    }
}

impl From<&PlayerError> for CResultCode {
    fn from(e: &PlayerError) -> Self {
        match e {
            PlayerError::NoPlayer => CResultCode::NoPlayer,
            PlayerError::DBusError(_) | PlayerError::FdoError(_) => CResultCode::PlayerError,
        }
    }
}

impl CModuleResponse {
    fn invalid() -> Self {
        CModuleResponse {
            full_text: ptr::null(),
            color: ptr::null(),
            cached_until: 0.0,
            valid: false,
        }
    }
}

fn to_c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

impl ResponseStrings {
    fn store(&mut self, response: &ModuleResponse) -> CModuleResponse {
        self.full_text = to_c_string(&response.full_text);
        self.color = to_c_string(&response.color);
        CModuleResponse {
            full_text: self.full_text.as_ptr(),
            color: self.color.as_ptr(),
            cached_until: response.cached_until_secs(),
            valid: true,
        }
    }

    fn store_json(&mut self, response: &ModuleResponse) -> *const c_char {
        match response.to_json() {
            Ok(json) => {
                self.json = to_c_string(&json);
                self.json.as_ptr()
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                ptr::null()
            }
        }
    }
}

/// Borrow an optional C string; null maps to `None`
unsafe fn optional_str<'a>(s: *const c_char) -> Result<Option<&'a str>, CResultCode> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s)
        .to_str()
        .map(Some)
        .map_err(|_| CResultCode::InvalidArgument)
}

/// Borrow a required C string
unsafe fn required_str<'a>(s: *const c_char) -> Result<&'a str, CResultCode> {
    optional_str(s)?.ok_or(CResultCode::NullPointer)
}

fn config_result(result: Result<(), ConfigError>) -> CResultCode {
    match result {
        Ok(()) => CResultCode::Ok,
        Err(e) => {
            tracing::warn!(error = %e, "config rejected");
            CResultCode::from(&e)
        }
    }
}

unsafe fn load_config<C: crate::config::ModuleConfig>(
    state: &mut ModuleState<C>,
    path: *const c_char,
) -> CResultCode {
    match optional_str(path) {
        Ok(path) => config_result(state.load_config(path)),
        Err(code) => code,
    }
}

unsafe fn set_option<C: crate::config::ModuleConfig>(
    state: &mut ModuleState<C>,
    key: *const c_char,
    value: *const c_char,
) -> CResultCode {
    let key = match required_str(key) {
        Ok(k) => k,
        Err(code) => return code,
    };
    let value = match required_str(value) {
        Ok(v) => v,
        Err(code) => return code,
    };
    config_result(state.set_option(key, value))
}

unsafe fn start_monitor<C: crate::config::ModuleConfig>(
    state: &mut ModuleState<C>,
    path: *const c_char,
) -> CResultCode {
    let path = match optional_str(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    match state.start_monitor(path) {
        Ok(()) => CResultCode::Ok,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start config monitor");
            CResultCode::MonitorError
        }
    }
}

/// Install the trace log subscriber
///
/// Events are written as JSON lines to `$STATUSBAR_MODULES_TRACE_LOG`, or
/// `statusbar_modules_trace.jsonl` in the temp dir. Safe to call repeatedly.
#[no_mangle]
pub extern "C" fn statusbar_modules_init_logging() {
    crate::telemetry::init_tracing();
}

/// Create a new insync module instance
///
/// # Safety
/// Returns a pointer that must be freed with `statusbar_insync_free`
#[no_mangle]
pub extern "C" fn statusbar_insync_new() -> *mut StatusbarInsync {
    let module = Box::new(StatusbarInsync {
        state: ModuleState::new(),
        last: ResponseStrings::default(),
    });
    Box::into_raw(module)
}

/// Free the insync module instance
///
/// # Safety
/// `module` must be a valid pointer returned by `statusbar_insync_new`
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_free(module: *mut StatusbarInsync) {
    if !module.is_null() {
        drop(Box::from_raw(module));
    }
}

/// Load configuration from the specified TOML file
///
/// # Safety
/// `module` must be valid, `path` must be a valid C string or null for default
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_load_config(
    module: *mut StatusbarInsync,
    path: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => load_config(&mut m.state, path),
        None => CResultCode::NullPointer,
    }
}

/// Set one configuration option, e.g. `format` or `color_good`
///
/// # Safety
/// `module` must be valid, `key` and `value` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_set_option(
    module: *mut StatusbarInsync,
    key: *const c_char,
    value: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => set_option(&mut m.state, key, value),
        None => CResultCode::NullPointer,
    }
}

/// Start monitoring the config file for changes
///
/// # Safety
/// `module` must be valid, `path` must be a valid C string or null for the
/// loaded file
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_start_monitor(
    module: *mut StatusbarInsync,
    path: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => start_monitor(&mut m.state, path),
        None => CResultCode::NullPointer,
    }
}

/// Stop monitoring the config file
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_stop_monitor(module: *mut StatusbarInsync) {
    if let Some(m) = module.as_mut() {
        m.state.stop_monitor();
    }
}

fn poll_insync(module: &mut StatusbarInsync) -> ModuleResponse {
    module.state.refresh();
    crate::insync::check_insync(&module.state.config, &module.state.palette, Utc::now())
}

/// Poll Insync (blocking: runs the insync binary twice)
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_status(module: *mut StatusbarInsync) -> CModuleResponse {
    let module = match module.as_mut() {
        Some(m) => m,
        None => return CModuleResponse::invalid(),
    };

    let response = poll_insync(module);
    module.last.store(&response)
}

/// Poll Insync and return the response as a JSON object
///
/// Returns null on failure. The string is owned by Rust and valid until the
/// next status call on this module.
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_insync_status_json(module: *mut StatusbarInsync) -> *const c_char {
    let module = match module.as_mut() {
        Some(m) => m,
        None => return ptr::null(),
    };

    let response = poll_insync(module);
    module.last.store_json(&response)
}

/// Create a new music module instance
///
/// # Safety
/// Returns a pointer that must be freed with `statusbar_music_free`
#[no_mangle]
pub extern "C" fn statusbar_music_new() -> *mut StatusbarMusic {
    let module = Box::new(StatusbarMusic {
        state: ModuleState::new(),
        locator: PlayerLocator::default(),
        last: ResponseStrings::default(),
    });
    Box::into_raw(module)
}

/// Free the music module instance
///
/// # Safety
/// `module` must be a valid pointer returned by `statusbar_music_new`
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_free(module: *mut StatusbarMusic) {
    if !module.is_null() {
        drop(Box::from_raw(module));
    }
}

/// Load configuration from the specified TOML file
///
/// # Safety
/// `module` must be valid, `path` must be a valid C string or null for default
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_load_config(
    module: *mut StatusbarMusic,
    path: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => load_config(&mut m.state, path),
        None => CResultCode::NullPointer,
    }
}

/// Set one configuration option, e.g. `player_name` or `button_left`
///
/// # Safety
/// `module` must be valid, `key` and `value` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_set_option(
    module: *mut StatusbarMusic,
    key: *const c_char,
    value: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => set_option(&mut m.state, key, value),
        None => CResultCode::NullPointer,
    }
}

/// Start monitoring the config file for changes
///
/// # Safety
/// `module` must be valid, `path` must be a valid C string or null for the
/// loaded file
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_start_monitor(
    module: *mut StatusbarMusic,
    path: *const c_char,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => start_monitor(&mut m.state, path),
        None => CResultCode::NullPointer,
    }
}

/// Stop monitoring the config file
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_stop_monitor(module: *mut StatusbarMusic) {
    if let Some(m) = module.as_mut() {
        m.state.stop_monitor();
    }
}

fn poll_music(module: &mut StatusbarMusic) -> ModuleResponse {
    module.state.refresh();
    let config = &module.state.config;
    let now = Utc::now();

    let result = module.locator.with_player(&config.player_name, |player| {
        crate::music::status(player, config, now)
    });
    match result {
        Ok(response) => response,
        Err(PlayerError::NoPlayer) => crate::music::down(config, now),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read player state");
            crate::music::down(config, now)
        }
    }
}

fn click_music(module: &mut StatusbarMusic, button: u32) -> CResultCode {
    module.state.refresh();
    let config = &module.state.config;

    if crate::music::click_action(config, button).is_none() {
        return CResultCode::Ok;
    }
    let result = module.locator.with_player(&config.player_name, |player| {
        crate::music::on_click(player, config, button)
    });
    match result {
        Ok(()) => CResultCode::Ok,
        Err(e) => {
            tracing::warn!(error = %e, button, "click action failed");
            CResultCode::from(&e)
        }
    }
}

/// Poll the media player (blocking D-Bus calls)
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_status(module: *mut StatusbarMusic) -> CModuleResponse {
    let module = match module.as_mut() {
        Some(m) => m,
        None => return CModuleResponse::invalid(),
    };

    let response = poll_music(module);
    module.last.store(&response)
}

/// Poll the media player and return the response as a JSON object
///
/// Returns null on failure. The string is owned by Rust and valid until the
/// next status call on this module.
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_status_json(module: *mut StatusbarMusic) -> *const c_char {
    let module = match module.as_mut() {
        Some(m) => m,
        None => return ptr::null(),
    };

    let response = poll_music(module);
    module.last.store_json(&response)
}

/// Handle a click on the music segment
///
/// `button` uses the bar protocol numbering: 1 left, 2 middle, 3 right,
/// 4/5 wheel up/down, 6/7 wheel left/right, 8/9 previous/next.
///
/// # Safety
/// `module` must be valid
#[no_mangle]
pub unsafe extern "C" fn statusbar_music_on_click(
    module: *mut StatusbarMusic,
    button: u32,
) -> CResultCode {
    match module.as_mut() {
        Some(m) => click_music(m, button),
        None => CResultCode::NullPointer,
    }
}
