//! Admission control: how many players are online, and whether one more
//! may join.
//!
//! Every accepted TCP connection bumps a shared counter and is classified
//! against two limits in the same atomic step:
//!
//! ```text
//!   n ≤ soft          → Accept
//!   soft < n ≤ hard   → AcceptThenDisconnect  (handshake, then "overloaded")
//!   n > hard          → Reject                (raw close, no handshake)
//! ```
//!
//! The increment is owned by an [`OnlinePermit`]; dropping the permit gives
//! it back. A rejected connection drops its permit immediately, so the
//! counter always equals the number of live sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ---------------------------------------------------------------------------
// Limits and decisions
// ---------------------------------------------------------------------------

/// The two online-player thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    /// Up to this many players are served normally.
    pub soft: usize,
    /// Up to this many are handshaken and told the server is overloaded.
    /// Beyond it connections are closed before the handshake.
    pub hard: usize,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            soft: 1500,
            hard: 2000,
        }
    }
}

impl AdmissionLimits {
    /// Classifies the `n`th live connection (counting itself).
    pub fn classify(&self, n: usize) -> AdmissionDecision {
        if n <= self.soft {
            AdmissionDecision::Accept
        } else if n <= self.hard {
            AdmissionDecision::AcceptThenDisconnect
        } else {
            AdmissionDecision::Reject
        }
    }
}

/// What to do with a freshly accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Serve normally.
    Accept,
    /// Complete the handshake, send `disconnect:overloaded`, close.
    AcceptThenDisconnect,
    /// Close the raw connection without a handshake.
    Reject,
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// The shared online-player counter plus the limits it is checked against.
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct Admission {
    limits: AdmissionLimits,
    online: Arc<AtomicUsize>,
}

impl Admission {
    /// Creates a counter starting at zero.
    pub fn new(limits: AdmissionLimits) -> Self {
        Self {
            limits,
            online: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counts one more connection and classifies it.
    ///
    /// The returned permit holds the increment. For
    /// [`AdmissionDecision::Reject`] the caller should drop it together with
    /// the socket.
    pub fn admit(&self) -> (AdmissionDecision, OnlinePermit) {
        let n = self.online.fetch_add(1, Ordering::AcqRel) + 1;
        let decision = self.limits.classify(n);
        if decision != AdmissionDecision::Accept {
            tracing::debug!(online = n, ?decision, "admission limit reached");
        }
        let permit = OnlinePermit {
            online: Arc::clone(&self.online),
        };
        (decision, permit)
    }

    /// Current number of live sessions.
    pub fn online(&self) -> usize {
        self.online.load(Ordering::Acquire)
    }

    /// The configured limits.
    pub fn limits(&self) -> AdmissionLimits {
        self.limits
    }
}

/// One unit of the online counter. Dropping it decrements the counter.
#[derive(Debug)]
pub struct OnlinePermit {
    online: Arc<AtomicUsize>,
}

impl Drop for OnlinePermit {
    fn drop(&mut self) {
        self.online.fetch_sub(1, Ordering::AcqRel);
    }
}
