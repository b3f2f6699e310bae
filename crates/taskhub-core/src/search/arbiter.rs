//! Last-issued-wins arbitration for a single logical query
//!
//! Each request gets a [`Ticket`] carrying the generation it was issued at
//! and a cancellation token. Issuing a new ticket cancels the previous
//! token and bumps the generation, so a late answer to an older request
//! fails [`RequestArbiter::settle`] no matter when it arrives.

use tokio_util::sync::CancellationToken;

/// Handle for one issued request
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token handed to the remote so it may abort early
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct RequestArbiter {
    generation: u64,
    outstanding: Option<CancellationToken>,
}

impl RequestArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any outstanding one
    pub fn issue(&mut self) -> Ticket {
        self.cancel_outstanding();
        self.generation = self.generation.wrapping_add(1);

        let token = CancellationToken::new();
        self.outstanding = Some(token.clone());
        Ticket {
            generation: self.generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Whether a request is outstanding
    pub fn in_flight(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Accept the answer for `ticket` if it is still the latest
    pub fn settle(&mut self, ticket: &Ticket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.outstanding = None;
        true
    }

    /// Cancel whatever is outstanding and invalidate every issued ticket
    pub fn reset(&mut self) {
        self.cancel_outstanding();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn cancel_outstanding(&mut self) {
        if let Some(token) = self.outstanding.take() {
            token.cancel();
        }
    }
}
