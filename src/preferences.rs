use std::collections::HashMap;
use std::sync::RwLock;

use crate::i18n::UiLanguage;

/// Opaque sender identity as reported by the transport.
pub type UserId = i64;

/// Per-user UI language choices.
///
/// Reads and writes are atomic per key; the last write wins.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, user: UserId) -> Option<UiLanguage>;
    fn set(&self, user: UserId, lang: UiLanguage);
}

/// Process-lifetime [`PreferenceStore`] with no persistence or expiry.
#[derive(Default)]
pub struct InMemoryPreferences {
    inner: RwLock<HashMap<UserId, UiLanguage>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn get(&self, user: UserId) -> Option<UiLanguage> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(&user).copied()
    }

    fn set(&self, user: UserId, lang: UiLanguage) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(user, lang);
    }
}
