//! Session registry: which transport address owns which player slot.
//!
//! Slots are a fixed array of `MAX_PLAYERS` entries. A connect takes the
//! lowest free slot, a disconnect or liveness timeout frees it again, and a
//! freed slot is immediately eligible for the next connect.

use log::info;
use shared::MAX_PLAYERS;
use std::net::SocketAddr;

/// A bound slot. Its presence in the registry is the session's active flag.
#[derive(Debug, Clone)]
pub struct Session {
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Display name from the connect request
    pub name: String,
    /// Server clock (ms) of the last packet heard from this client
    pub last_heard: u64,
}

impl Session {
    pub fn new(addr: SocketAddr, name: String, now: u64) -> Self {
        Self {
            addr,
            name,
            last_heard: now,
        }
    }

    /// True once the client has been silent for longer than `timeout_ms`
    pub fn is_timed_out(&self, now: u64, timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_heard) > timeout_ms
    }
}

pub struct ClientManager {
    sessions: [Option<Session>; MAX_PLAYERS],
    timeout_ms: u64,
}

impl ClientManager {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            sessions: Default::default(),
            timeout_ms,
        }
    }

    /// Lowest unbound slot, by linear scan
    pub fn find_free_slot(&self) -> Option<usize> {
        self.sessions.iter().position(Option::is_none)
    }

    pub fn find_slot_by_addr(&self, addr: SocketAddr) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.addr == addr))
    }

    /// Binds `addr` to the lowest free slot.
    ///
    /// Returns `None` when every slot is taken; nothing is allocated then.
    pub fn add_client(&mut self, addr: SocketAddr, name: String, now: u64) -> Option<usize> {
        let slot = self.find_free_slot()?;
        info!("Client '{}' bound to slot {} from {}", name, slot, addr);
        self.sessions[slot] = Some(Session::new(addr, name, now));
        Some(slot)
    }

    /// Frees a slot. Returns the session that held it, if any.
    pub fn remove_client(&mut self, slot: usize) -> Option<Session> {
        self.sessions.get_mut(slot)?.take()
    }

    pub fn get(&self, slot: usize) -> Option<&Session> {
        self.sessions.get(slot)?.as_ref()
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Refreshes the liveness timestamp. Returns false for an unbound slot.
    pub fn touch(&mut self, slot: usize, now: u64) -> bool {
        match self.sessions.get_mut(slot) {
            Some(Some(session)) => {
                session.last_heard = now;
                true
            }
            _ => false,
        }
    }

    /// Slots whose clients have been silent for longer than the timeout.
    ///
    /// The sessions are left in place; the caller disconnects them through
    /// the same path as an explicit disconnect.
    pub fn timed_out(&self, now: u64) -> Vec<usize> {
        self.sessions
            .iter()
            .enumerate()
            .filter_map(|(slot, session)| {
                session
                    .as_ref()
                    .filter(|s| s.is_timed_out(now, self.timeout_ms))
                    .map(|_| slot)
            })
            .collect()
    }

    /// `(slot, address)` for every active session
    pub fn get_client_addrs(&self) -> Vec<(usize, SocketAddr)> {
        self.sessions
            .iter()
            .enumerate()
            .filter_map(|(slot, session)| session.as_ref().map(|s| (slot, s.addr)))
            .collect()
    }

    /// Number of active sessions
    pub fn len(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
