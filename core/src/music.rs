//! Current song display and player controls

use chrono::{DateTime, Utc};

use crate::config::MusicConfig;
use crate::duration::TimeElements;
use crate::format::{self, FormatValue, Lookup};
use crate::mpris::{MediaPlayer, Metadata, PlaybackStatus, PlayerError};
use crate::response::ModuleResponse;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Mouse buttons as numbered by the bar protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
    Previous,
    Next,
}

impl Button {
    pub fn from_number(button: u32) -> Option<Self> {
        let button = match button {
            1 => Button::Left,
            2 => Button::Middle,
            3 => Button::Right,
            4 => Button::WheelUp,
            5 => Button::WheelDown,
            6 => Button::WheelLeft,
            7 => Button::WheelRight,
            8 => Button::Previous,
            9 => Button::Next,
            _ => return None,
        };
        Some(button)
    }

    /// The action name configured for this button
    fn binding(self, config: &MusicConfig) -> &str {
        match self {
            Button::Left => &config.button_left,
            Button::Middle => &config.button_middle,
            Button::Right => &config.button_right,
            Button::WheelUp => &config.button_wheel_up,
            Button::WheelDown => &config.button_wheel_down,
            Button::WheelLeft => &config.button_wheel_left,
            Button::WheelRight => &config.button_wheel_right,
            Button::Previous => &config.button_previous,
            Button::Next => &config.button_next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play,
    Toggle,
    Pause,
    Stop,
    VolumeUp,
    VolumeDown,
    Next,
    Previous,
    Forward,
    Backward,
}

impl Action {
    /// Empty or unrecognised names bind no action
    pub fn parse(name: &str) -> Option<Self> {
        let action = match name {
            "play" => Action::Play,
            "toggle" => Action::Toggle,
            "pause" => Action::Pause,
            "stop" => Action::Stop,
            "volume_up" => Action::VolumeUp,
            "volume_down" => Action::VolumeDown,
            "next" => Action::Next,
            "previous" => Action::Previous,
            "forward" => Action::Forward,
            "backward" => Action::Backward,
            _ => return None,
        };
        Some(action)
    }

    fn apply(self, player: &dyn MediaPlayer, config: &MusicConfig) -> Result<(), PlayerError> {
        let seek = config.seek_offset.saturating_mul(MICROS_PER_SECOND);
        match self {
            Action::Play => player.play(),
            Action::Toggle => player.play_pause(),
            Action::Pause => player.pause(),
            Action::Stop => player.stop(),
            Action::VolumeUp => player.set_volume(player.volume()? + config.volume_offset),
            Action::VolumeDown => player.set_volume(player.volume()? - config.volume_offset),
            Action::Next => player.next(),
            Action::Previous => player.previous(),
            Action::Forward => player.seek(seek),
            Action::Backward => player.seek(seek.saturating_neg()),
        }
    }
}

/// Shown when no player is reachable
pub fn down(config: &MusicConfig, now: DateTime<Utc>) -> ModuleResponse {
    ModuleResponse::new(
        config.format_down.clone(),
        config.color_down.clone(),
        now,
        config.cache_timeout_down,
    )
}

struct Snapshot {
    metadata: Metadata,
    status: PlaybackStatus,
    position: i64,
}

fn snapshot(player: &dyn MediaPlayer) -> Result<Snapshot, PlayerError> {
    Ok(Snapshot {
        metadata: player.metadata()?,
        status: player.playback_status()?,
        position: player.position()?,
    })
}

fn optional(value: &Option<String>) -> Lookup {
    match value {
        Some(v) => Lookup::Value(FormatValue::Text(v.clone())),
        None => Lookup::Empty,
    }
}

/// Build the status line for `player`
pub fn status(
    player: &dyn MediaPlayer,
    config: &MusicConfig,
    now: DateTime<Utc>,
) -> Result<ModuleResponse, PlayerError> {
    let snap = snapshot(player)?;

    let meta = &snap.metadata;
    let length = TimeElements::from_micros(meta.length).render(&config.length_format);
    let position = TimeElements::from_micros(Some(snap.position)).render(&config.position_format);

    let (template, color, timeout) = match snap.status {
        PlaybackStatus::Playing => (&config.format, &config.color, config.cache_timeout),
        PlaybackStatus::Paused => (
            &config.format_paused,
            &config.color_paused,
            config.cache_timeout_paused,
        ),
        PlaybackStatus::Stopped => (
            &config.format_stopped,
            &config.color_stopped,
            config.cache_timeout_stopped,
        ),
    };

    let full_text = format::render(template, |name| match name {
        "artist" => optional(&meta.artist),
        "title" => optional(&meta.title),
        "genre" => optional(&meta.genre),
        "url" => optional(&meta.url),
        "album" => optional(&meta.album),
        "length" => Lookup::Value(FormatValue::Text(length.clone())),
        "position" => Lookup::Value(FormatValue::Text(position.clone())),
        _ => Lookup::Unknown,
    });

    Ok(ModuleResponse::new(full_text, color.clone(), now, timeout))
}

/// The action bound to `button`, if any
pub fn click_action(config: &MusicConfig, button: u32) -> Option<Action> {
    Action::parse(Button::from_number(button)?.binding(config))
}

/// Run the action bound to `button`, if any
pub fn on_click(
    player: &dyn MediaPlayer,
    config: &MusicConfig,
    button: u32,
) -> Result<(), PlayerError> {
    let Some(action) = click_action(config, button) else {
        return Ok(());
    };

    tracing::debug!(?action, "running click action");
    action.apply(player, config)
}
