//! The song-request queue: snapshot types, payload parsing and the API client.

mod client;
mod model;

pub use client::{QueueClient, QueueControl};
pub use model::{parse_queue, parse_user_name, Queue, QueueEntry, QueueSnapshot, PLAYLIST_USER};
