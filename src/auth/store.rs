use std::sync::RwLock;

use super::token::Token;

/// Holds the current access token for every in-flight request.
///
/// One writer (the auth session), many readers (the transport). The whole
/// token is swapped under the lock so a reader never sees a partial value.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<Token>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer string, or empty when absent or past its known expiry.
    pub fn get_token(&self) -> String {
        match self.current.read() {
            Ok(guard) => guard
                .as_ref()
                .filter(|token| !token.is_expired())
                .map(|token| token.access_token.clone())
                .unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    pub fn set_token(&self, token: Token) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    pub fn clear(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Full token including expiry metadata.
    pub fn snapshot(&self) -> Option<Token> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    pub fn has_token(&self) -> bool {
        !self.get_token().is_empty()
    }
}
