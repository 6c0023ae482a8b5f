use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use uuid::Uuid;

use crate::cart::Cart;

/// Opaque per-client session key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept only well-formed UUIDs so clients cannot pick arbitrary keys.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(|u| Self(u.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value store of carts keyed by session.
///
/// Handlers load, mutate and save; there is no locking across that
/// sequence, requests within a session are assumed sequential.
pub trait CartStore: Send + Sync {
    /// The session's cart, or an empty cart for an unknown session.
    fn load(&self, session: &SessionId) -> Result<Cart>;
    fn save(&self, session: &SessionId, cart: Cart) -> Result<()>;
}

/// Sessions kept at most by [`MemoryCartStore::new`].
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
/// Carts untouched for this long are dropped by [`MemoryCartStore::new`].
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct StoredCart {
    touched: Instant,
    cart: Cart,
}

/// Process-local cart store.
///
/// Bounded: carts idle longer than the TTL are pruned on every save, and
/// once `max_sessions` is reached the least recently touched cart is
/// evicted to make room.
#[derive(Debug)]
pub struct MemoryCartStore {
    carts: Mutex<HashMap<SessionId, StoredCart>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl Default for MemoryCartStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_IDLE_TTL)
    }
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            carts: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.carts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self, session: &SessionId) -> Result<Cart> {
        let mut carts = self
            .carts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match carts.get_mut(session) {
            Some(stored) if stored.touched.elapsed() < self.idle_ttl => {
                stored.touched = Instant::now();
                Ok(stored.cart.clone())
            }
            Some(_) => {
                carts.remove(session);
                Ok(Cart::default())
            }
            None => Ok(Cart::default()),
        }
    }

    fn save(&self, session: &SessionId, cart: Cart) -> Result<()> {
        let mut carts = self
            .carts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let ttl = self.idle_ttl;
        carts.retain(|_, stored| stored.touched.elapsed() < ttl);

        // Empty carts are not worth keeping around
        if cart.is_empty() {
            carts.remove(session);
            return Ok(());
        }

        if !carts.contains_key(session) && carts.len() >= self.max_sessions {
            let oldest = carts
                .iter()
                .min_by_key(|(_, stored)| stored.touched)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(session = %oldest, "evicting least recently used cart");
                carts.remove(&oldest);
            }
        }

        carts.insert(
            session.clone(),
            StoredCart {
                touched: Instant::now(),
                cart,
            },
        );
        Ok(())
    }
}
