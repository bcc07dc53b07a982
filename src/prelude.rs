//! Convenience re-exports for common use.

pub use crate::auth::{AuthSession, AuthStart, AuthState, NightbotDeviceAuth, Token, TokenStore};
pub use crate::config::{Settings, SettingsStore, SrConfig};
pub use crate::error::{Result, SrError};
pub use crate::events::{EventBus, SrEvent};
pub use crate::queue::{Queue, QueueClient, QueueEntry};
pub use crate::sync::SyncCoordinator;
pub use crate::transport::{ApiTransport, RequestBody, RequestOutcome};
