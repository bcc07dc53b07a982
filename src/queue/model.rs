use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SrError;

/// Requester label for tracks the bot filled in from its playlist.
pub const PLAYLIST_USER: &str = "playlist";

/// One song in the queue. Position 0 is the song currently playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub id: String,
    pub title: String,
    pub submitted_by: String,
    pub duration_secs: u32,
    pub position: u32,
}

impl QueueEntry {
    pub fn is_current(&self) -> bool {
        self.position == 0
    }

    /// `m:ss`, the way the queue table shows it.
    pub fn duration_label(&self) -> String {
        format!("{}:{:02}", self.duration_secs / 60, self.duration_secs % 60)
    }
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] ({})",
            self.position,
            self.title,
            self.duration_label(),
            self.submitted_by
        )
    }
}

/// A full snapshot of the remote queue, sorted by position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}

impl Queue {
    /// Builds a snapshot, sorting by position. Ties keep their input order.
    pub fn new(mut entries: Vec<QueueEntry>) -> Self {
        entries.sort_by_key(|entry| entry.position);
        Self { entries }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueueEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.entries.first().filter(|entry| entry.is_current())
    }

    pub fn upcoming(&self) -> &[QueueEntry] {
        match self.current() {
            Some(_) => &self.entries[1..],
            None => &self.entries,
        }
    }

    pub fn find(&self, id: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Sum of every entry's duration.
    pub fn total_duration_secs(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.duration_secs)).sum()
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a QueueEntry;
    type IntoIter = std::slice::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parsed queue response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSnapshot {
    pub queue: Queue,
    /// `None` when the payload carried no flag.
    pub requests_enabled: Option<bool>,
}

/// Parse a `GET /1/song_requests/queue` body.
///
/// Missing or mistyped leaf fields become empty strings and zeros. Only a body
/// that is not a JSON object (or whose nested objects have the wrong shape)
/// is an error.
pub fn parse_queue(body: &[u8], playlist_label: &str) -> Result<QueueSnapshot, SrError> {
    let payload: QueuePayload = serde_json::from_slice(body)
        .map_err(|e| SrError::MalformedResponse(format!("queue payload: {e}")))?;

    let mut entries = Vec::with_capacity(payload.queue.len() + 1);
    if let Some(current) = payload.current_song {
        let submitted_by = match current.user {
            Some(user) => user.display_name,
            None => playlist_label.to_string(),
        };
        entries.push(QueueEntry {
            id: current.id,
            title: current.track.title,
            submitted_by,
            duration_secs: current.track.duration,
            position: 0,
        });
    }
    // Position 0 belongs to the current song; list items without a usable
    // position go after the last positioned one, in payload order.
    let mut next_free = payload
        .queue
        .iter()
        .filter_map(|song| song.position)
        .max()
        .unwrap_or(0)
        .saturating_add(1);
    entries.extend(payload.queue.into_iter().map(|song| {
        let position = match song.position {
            Some(position) if position > 0 => position,
            _ => {
                let position = next_free;
                next_free = next_free.saturating_add(1);
                position
            }
        };
        QueueEntry {
            id: song.id,
            title: song.track.title,
            submitted_by: song.user.map(|u| u.display_name).unwrap_or_default(),
            duration_secs: song.track.duration,
            position,
        }
    }));

    Ok(QueueSnapshot {
        queue: Queue::new(entries),
        requests_enabled: payload.requests_enabled,
    })
}

/// Parse a `GET /1/me` body into the display name.
pub fn parse_user_name(body: &[u8]) -> Result<String, SrError> {
    let payload: MePayload = serde_json::from_slice(body)
        .map_err(|e| SrError::MalformedResponse(format!("user payload: {e}")))?;
    Ok(payload.user.map(|u| u.display_name).unwrap_or_default())
}

/// Title of the song a successful add returned, if any.
pub(crate) fn parse_added_title(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .pointer("/item/track/title")
        .and_then(Value::as_str)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct QueuePayload {
    #[serde(rename = "_requestsEnabled", default, deserialize_with = "lenient_flag")]
    requests_enabled: Option<bool>,
    #[serde(rename = "_currentSong", default)]
    current_song: Option<SongPayload>,
    #[serde(default, deserialize_with = "nullable_list")]
    queue: Vec<SongPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SongPayload {
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    id: String,
    #[serde(rename = "_position", deserialize_with = "lenient_position")]
    position: Option<u32>,
    #[serde(deserialize_with = "nullable_object")]
    track: TrackPayload,
    user: Option<UserPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackPayload {
    #[serde(deserialize_with = "lenient_string")]
    title: String,
    #[serde(deserialize_with = "lenient_u32")]
    duration: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserPayload {
    #[serde(rename = "displayName", deserialize_with = "lenient_string")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct MePayload {
    #[serde(default)]
    user: Option<UserPayload>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(non_negative(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn lenient_position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(non_negative(&Value::deserialize(deserializer)?))
}

/// A JSON number at or above zero, saturated to `u32`.
fn non_negative(value: &Value) -> Option<u32> {
    let number = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))?;
    Some(u32::try_from(number).unwrap_or(u32::MAX))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        _ => Some(false),
    })
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
