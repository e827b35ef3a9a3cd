//! Display-name persistence.
//!
//! Only the name survives a reload; every restore mints a fresh identity id
//! so two tabs with the same saved name are still distinct participants.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use std::rc::Rc;

use crate::net::error::IdentityError;
use crate::net::types::User;
use crate::util::clock::new_id;
use crate::util::storage::KeyValueStore;

/// Storage key of the saved display name.
pub const USER_NAME_KEY: &str = "mixUserName";

const USER_ID_PREFIX: &str = "user";

pub struct IdentityStore {
    store: Rc<dyn KeyValueStore>,
}

impl IdentityStore {
    #[must_use]
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved display name, if a non-blank one exists.
    #[must_use]
    pub fn saved_name(&self) -> Option<String> {
        let name = self.store.get_item(USER_NAME_KEY)?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_owned())
    }

    /// Identity for the saved name, with a freshly generated id.
    #[must_use]
    pub fn restore_identity(&self) -> Option<User> {
        let name = self.saved_name()?;
        Some(User { id: new_id(USER_ID_PREFIX), name })
    }

    /// Create an identity for `name` and persist the name.
    ///
    /// # Errors
    ///
    /// [`IdentityError::BlankName`] when `name` is blank; nothing is saved.
    pub fn create_identity(&self, name: &str) -> Result<User, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::BlankName);
        }
        self.store.set_item(USER_NAME_KEY, name);
        Ok(User { id: new_id(USER_ID_PREFIX), name: name.to_owned() })
    }

    /// Drop the saved name (sign out).
    pub fn forget(&self) {
        self.store.remove_item(USER_NAME_KEY);
    }
}
