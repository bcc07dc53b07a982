//! OAuth device-code flow, token holding and credential persistence.

pub mod backend;
pub mod credentials;
pub mod device_code;
pub mod error;
pub mod nightbot;
pub mod session;
pub mod store;
pub mod token;

pub use backend::DeviceAuthorizer;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use device_code::{DeviceCodePoll, DeviceCodeSession};
pub use error::AuthError;
pub use nightbot::NightbotDeviceAuth;
pub use session::{AuthSession, AuthStart, AuthState};
pub use store::TokenStore;
pub use token::Token;
