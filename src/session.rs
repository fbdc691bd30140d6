use std::sync::RwLock;

/// Bearer token shared by every handle of one client.
///
/// Written by `authenticate`, read by every other call. There is no expiry
/// tracking: a rejected token surfaces as `Error::Authentication` and the
/// caller re-authenticates.
#[derive(Default)]
pub(crate) struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn set_token(&self, token: String) {
        match self.token.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|t| t.is_some())
    }

    /// `Authorization` header value, or `None` before the first `authenticate`.
    pub fn authorization(&self) -> Option<String> {
        self.read(|t| t.as_ref().map(|token| format!("Token {token}")))
    }

    fn read<T>(&self, f: impl FnOnce(&Option<String>) -> T) -> T {
        match self.token.read() {
            Ok(guard) => f(&*guard),
            Err(poisoned) => f(&*poisoned.into_inner()),
        }
    }
}
