//! nightbot-sr: a client core for Nightbot song requests.
//!
//! Signs in through the OAuth2 device flow, keeps the access token, and
//! drives the song-request queue API: fetching snapshots and sending play,
//! pause, skip, delete, promote and toggle commands with follow-up refreshes.
//! Results reach the host through an [`events::EventBus`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use nightbot_sr::prelude::{
//!     ApiTransport, AuthSession, EventBus, NightbotDeviceAuth, QueueClient, SrConfig, TokenStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SrConfig::from_env();
//! let events = EventBus::new();
//! let tokens = Arc::new(TokenStore::new());
//! let session = AuthSession::new(
//!     Arc::new(NightbotDeviceAuth::from_config(&config)?),
//!     Arc::clone(&tokens),
//!     events.clone(),
//! );
//! let transport = ApiTransport::new(Arc::clone(&tokens), &config)?;
//! let client = QueueClient::from_config(transport, events.clone(), &config)
//!     .with_session(session.clone());
//!
//! session.authenticate().await?;
//! // ...once AuthCompleted { success: true } arrives:
//! let queue = client.fetch_queue().await;
//! for entry in &queue {
//!     println!("{entry}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod prelude;
pub mod queue;
pub mod sync;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
