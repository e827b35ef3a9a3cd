//! Binds a local identity to the connection with a one-shot handshake.
//!
//! The handshake (`USER_IDENTIFY`) goes out once per transition into
//! `connected`, as soon as an identity is also known. The condition is
//! re-evaluated whenever either side changes; the connection epoch keeps a
//! later unrelated state change from sending it twice.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::net::commands::OutboundCommand;
use crate::net::connection::ConnectionManager;
use crate::net::error::IdentityError;
use crate::net::registry::Subscription;
use crate::net::types::{ConnectionState, IdentifyPayload, User};

struct Inner {
    connection: ConnectionManager,
    identity: RefCell<Option<User>>,
    identified_epoch: Cell<Option<u64>>,
}

impl Inner {
    fn evaluate(&self) {
        if !self.connection.is_connected() {
            return;
        }
        let epoch = self.connection.epoch();
        if self.identified_epoch.get() == Some(epoch) {
            return;
        }
        let Some(user) = self.identity.borrow().clone() else {
            return;
        };

        let command = OutboundCommand::UserIdentify(IdentifyPayload::from(&user));
        if self.connection.send_command(&command) {
            log::info!("identified as {} ({})", user.name, user.id);
            self.identified_epoch.set(Some(epoch));
        }
    }
}

/// Owns the identity for one connection and performs the handshake.
pub struct IdentityBinding {
    inner: Rc<Inner>,
    subscription: Option<Subscription>,
}

impl IdentityBinding {
    #[must_use]
    pub fn new(connection: ConnectionManager) -> Self {
        let inner = Rc::new(Inner {
            connection,
            identity: RefCell::new(None),
            identified_epoch: Cell::new(None),
        });

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let subscription = inner.connection.on_state_change(move |state| {
            if state == ConnectionState::Connected {
                if let Some(inner) = weak.upgrade() {
                    inner.evaluate();
                }
            }
            Ok(())
        });

        Self { inner, subscription: Some(subscription) }
    }

    /// Set the identity once. Setting the same identity again is a no-op.
    ///
    /// # Errors
    ///
    /// [`IdentityError::BlankName`] for a blank display name and
    /// [`IdentityError::AlreadySet`] when a different identity is bound.
    pub fn set_identity(&self, user: User) -> Result<(), IdentityError> {
        if user.name.trim().is_empty() {
            return Err(IdentityError::BlankName);
        }
        {
            let mut current = self.inner.identity.borrow_mut();
            match current.as_ref() {
                Some(existing) if *existing == user => return Ok(()),
                Some(existing) => {
                    return Err(IdentityError::AlreadySet { current: existing.name.clone() });
                }
                None => *current = Some(user),
            }
        }
        self.inner.evaluate();
        Ok(())
    }

    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.inner.identity.borrow().clone()
    }

    /// Whether the handshake went out on the current connection.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.inner.connection.is_connected() && self.inner.identified_epoch.get() == Some(self.inner.connection.epoch())
    }
}

impl Drop for IdentityBinding {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
