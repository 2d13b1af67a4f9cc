//! MPRIS2 media players on the D-Bus session bus

use std::collections::HashMap;
use thiserror::Error;
use zbus::blocking::{fdo::DBusProxy, Connection};
use zbus::proxy::CacheProperties;
use zbus::zvariant::{OwnedValue, Value};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("No MPRIS player found")]
    NoPlayer,
    #[error("D-Bus error: {0}")]
    DBusError(#[from] zbus::Error),
    #[error("D-Bus call failed: {0}")]
    FdoError(#[from] zbus::fdo::Error),
}

fn is_transport_zbus(e: &zbus::Error) -> bool {
    match e {
        zbus::Error::MethodError(..) => false,
        zbus::Error::FDO(inner) => is_transport_fdo(inner),
        _ => true,
    }
}

fn is_transport_fdo(e: &zbus::fdo::Error) -> bool {
    matches!(e, zbus::fdo::Error::ZBus(inner) if is_transport_zbus(inner))
}

impl PlayerError {
    /// Whether the failure lies with the bus connection rather than the player
    ///
    /// Errors replied by the bus or the player (unknown service, method
    /// failures) leave the connection usable.
    pub fn is_transport(&self) -> bool {
        match self {
            PlayerError::NoPlayer => false,
            PlayerError::DBusError(e) => is_transport_zbus(e),
            PlayerError::FdoError(e) => is_transport_fdo(e),
        }
    }
}

/// Well-known bus name prefix shared by every MPRIS player
pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[zbus::proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_async = false
)]
trait Player {
    fn next(&self) -> zbus::Result<()>;

    fn previous(&self) -> zbus::Result<()>;

    fn pause(&self) -> zbus::Result<()>;

    fn play_pause(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    fn play(&self) -> zbus::Result<()>;

    fn seek(&self, offset: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    #[zbus(property)]
    fn volume(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn set_volume(&self, value: f64) -> zbus::Result<()>;

    #[zbus(property)]
    fn position(&self) -> zbus::Result<i64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    /// Anything other than `Playing`/`Paused` counts as stopped
    pub fn parse(status: &str) -> Self {
        match status {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }
}

/// Track fields the music module exposes as placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub url: Option<String>,
    pub album: Option<String>,
    /// Microseconds
    pub length: Option<i64>,
}

fn text(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.to_string()),
        Value::ObjectPath(p) => Some(p.to_string()),
        Value::Value(inner) => text(inner),
        _ => None,
    }
}

/// First element of a string list; players sending a bare string are tolerated
fn first_text(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(text),
        Value::Value(inner) => first_text(inner),
        other => text(other),
    }
}

fn integer(value: &Value<'_>) -> Option<i64> {
    match value {
        Value::I64(n) => Some(*n),
        Value::U64(n) => i64::try_from(*n).ok(),
        Value::I32(n) => Some(i64::from(*n)),
        Value::U32(n) => Some(i64::from(*n)),
        Value::I16(n) => Some(i64::from(*n)),
        Value::U16(n) => Some(i64::from(*n)),
        Value::F64(x) => Some(*x as i64),
        Value::Value(inner) => integer(inner),
        _ => None,
    }
}

impl Metadata {
    pub fn from_dbus(map: &HashMap<String, OwnedValue>) -> Self {
        Self::from_lookup(|key| map.get(key).map(|v| &**v))
    }

    pub(crate) fn from_lookup<'v, F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<&'v Value<'v>>,
    {
        Metadata {
            artist: get("xesam:artist").and_then(first_text),
            title: get("xesam:title").and_then(text),
            genre: get("xesam:genre").and_then(first_text),
            url: get("xesam:url").and_then(text),
            album: get("xesam:album").and_then(text),
            length: get("mpris:length").and_then(integer),
        }
    }
}

/// Operations the music module needs from a player
pub trait MediaPlayer {
    fn metadata(&self) -> Result<Metadata, PlayerError>;
    fn playback_status(&self) -> Result<PlaybackStatus, PlayerError>;
    /// Microseconds
    fn position(&self) -> Result<i64, PlayerError>;
    fn volume(&self) -> Result<f64, PlayerError>;
    fn set_volume(&self, volume: f64) -> Result<(), PlayerError>;
    fn play(&self) -> Result<(), PlayerError>;
    fn play_pause(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
    fn next(&self) -> Result<(), PlayerError>;
    fn previous(&self) -> Result<(), PlayerError>;
    /// Relative seek in microseconds
    fn seek(&self, offset: i64) -> Result<(), PlayerError>;
}

fn configured_bus_name(player_name: &str) -> String {
    format!("{}{}", MPRIS_PREFIX, player_name)
}

fn first_player<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    names
        .into_iter()
        .find(|name| name.starts_with(MPRIS_PREFIX))
        .map(str::to_string)
}

/// Pick the bus name of the player to talk to
///
/// A configured `player_name` wins; otherwise the first MPRIS name on the
/// session bus is used.
pub fn player_bus_name(
    connection: &Connection,
    player_name: &str,
) -> Result<Option<String>, PlayerError> {
    if !player_name.is_empty() {
        return Ok(Some(configured_bus_name(player_name)));
    }

    let names = DBusProxy::new(connection)?.list_names()?;
    Ok(first_player(names.iter().map(|name| name.as_str())))
}

/// A player reached over the session bus
pub struct MprisPlayer {
    proxy: PlayerProxy<'static>,
}

impl MprisPlayer {
    pub fn new(connection: &Connection, bus_name: &str) -> Result<Self, PlayerError> {
        // Position never emits PropertiesChanged, so cached values would go stale
        let proxy = PlayerProxy::builder(connection)
            .destination(bus_name.to_string())?
            .cache_properties(CacheProperties::No)
            .build()?;
        Ok(MprisPlayer { proxy })
    }
}

/// Finds the player to use on each poll, reusing one session connection
#[derive(Default)]
pub struct PlayerLocator {
    connection: Option<Connection>,
}

impl PlayerLocator {
    fn connection(&mut self) -> Result<Connection, PlayerError> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }
        let connection = Connection::session()?;
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    /// Open the configured (or first) player on the session bus
    fn locate(&mut self, player_name: &str) -> Result<MprisPlayer, PlayerError> {
        let connection = self.connection()?;
        let bus_name = player_bus_name(&connection, player_name)?.ok_or(PlayerError::NoPlayer)?;
        tracing::debug!(player = %bus_name, "using MPRIS player");
        MprisPlayer::new(&connection, &bus_name)
    }

    /// Locate the player and run `f` against it
    ///
    /// A transport failure at any step, including inside `f`, drops the
    /// cached connection so the next call reconnects.
    pub fn with_player<T, F>(&mut self, player_name: &str, f: F) -> Result<T, PlayerError>
    where
        F: FnOnce(&MprisPlayer) -> Result<T, PlayerError>,
    {
        let result = self.locate(player_name).and_then(|player| f(&player));
        if let Err(e) = &result {
            self.forget_on_transport_error(e);
        }
        result
    }

    fn forget_on_transport_error(&mut self, e: &PlayerError) {
        if e.is_transport() && self.connection.take().is_some() {
            tracing::info!(error = %e, "dropping session bus connection");
        }
    }
}

impl MediaPlayer for MprisPlayer {
    fn metadata(&self) -> Result<Metadata, PlayerError> {
        Ok(Metadata::from_dbus(&self.proxy.metadata()?))
    }

    fn playback_status(&self) -> Result<PlaybackStatus, PlayerError> {
        Ok(PlaybackStatus::parse(&self.proxy.playback_status()?))
    }

    fn position(&self) -> Result<i64, PlayerError> {
        Ok(self.proxy.position()?)
    }

    fn volume(&self) -> Result<f64, PlayerError> {
        Ok(self.proxy.volume()?)
    }

    fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        Ok(self.proxy.set_volume(volume)?)
    }

    fn play(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.play()?)
    }

    fn play_pause(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.play_pause()?)
    }

    fn pause(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.pause()?)
    }

    fn stop(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.stop()?)
    }

    fn next(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.next()?)
    }

    fn previous(&self) -> Result<(), PlayerError> {
        Ok(self.proxy.previous()?)
    }

    fn seek(&self, offset: i64) -> Result<(), PlayerError> {
        Ok(self.proxy.seek(offset)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_status_parse() {
        assert_eq!(PlaybackStatus::parse("Playing"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::parse("Paused"), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::parse("Stopped"), PlaybackStatus::Stopped);
        assert_eq!(PlaybackStatus::parse(""), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_transport_errors_are_classified() {
        let broken_pipe =
            || zbus::Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));

        assert!(PlayerError::DBusError(broken_pipe()).is_transport());
        // What list_names hands back when the socket is gone
        assert!(PlayerError::from(zbus::fdo::Error::from(broken_pipe())).is_transport());

        let wrapped = zbus::Error::FDO(Box::new(zbus::fdo::Error::ZBus(broken_pipe())));
        assert!(PlayerError::DBusError(wrapped).is_transport());
    }

    #[test]
    fn test_replied_errors_keep_connection() {
        let unknown =
            || zbus::fdo::Error::ServiceUnknown("org.mpris.MediaPlayer2.vlc".to_string());

        assert!(!PlayerError::NoPlayer.is_transport());
        assert!(!PlayerError::FdoError(unknown()).is_transport());
        assert!(!PlayerError::DBusError(zbus::Error::FDO(Box::new(unknown()))).is_transport());
    }

    #[test]
    fn test_first_player_skips_other_names() {
        let names = [
            "org.freedesktop.DBus",
            ":1.42",
            "org.mpris.MediaPlayer2.spotify",
            "org.mpris.MediaPlayer2.vlc",
        ];
        assert_eq!(
            first_player(names),
            Some("org.mpris.MediaPlayer2.spotify".to_string())
        );
        assert_eq!(first_player(["org.freedesktop.Notifications"]), None);
        assert_eq!(first_player([]), None);
    }

    #[test]
    fn test_configured_bus_name() {
        assert_eq!(configured_bus_name("mpd"), "org.mpris.MediaPlayer2.mpd");
    }

    #[test]
    fn test_metadata_from_values() {
        let mut map: HashMap<&str, Value<'static>> = HashMap::new();
        map.insert("xesam:artist", Value::from(vec!["Boards of Canada", "Other"]));
        map.insert("xesam:title", Value::from("Roygbiv"));
        map.insert("xesam:genre", Value::from(vec!["Electronic"]));
        map.insert("xesam:album", Value::from("Music Has the Right to Children"));
        map.insert("mpris:length", Value::from(151_000_000i64));

        let meta = Metadata::from_lookup(|key| map.get(key));

        assert_eq!(meta.artist.as_deref(), Some("Boards of Canada"));
        assert_eq!(meta.title.as_deref(), Some("Roygbiv"));
        assert_eq!(meta.genre.as_deref(), Some("Electronic"));
        assert_eq!(meta.album.as_deref(), Some("Music Has the Right to Children"));
        assert_eq!(meta.url, None);
        assert_eq!(meta.length, Some(151_000_000));
    }

    #[test]
    fn test_metadata_tolerates_loose_types() {
        let mut map: HashMap<&str, Value<'static>> = HashMap::new();
        map.insert("xesam:artist", Value::from("Solo Artist"));
        map.insert("mpris:length", Value::from(42u64));
        map.insert("xesam:title", Value::from(7i32));

        let meta = Metadata::from_lookup(|key| map.get(key));

        assert_eq!(meta.artist.as_deref(), Some("Solo Artist"));
        assert_eq!(meta.length, Some(42));
        assert_eq!(meta.title, None);
    }
}
