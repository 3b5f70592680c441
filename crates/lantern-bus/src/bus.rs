//! The agent bus — mailboxes, dispatch tasks, and request/reply plumbing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use lantern_core::{
    AgentEnvelope, AgentId, CorrelationId, KIND_AGENT_FAILED, LanternError, Priority, Recipient,
    Result,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// A bus participant.
///
/// `handle` is invoked for one envelope at a time; returned envelopes are
/// published by the bus on the handler's behalf.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identity this agent is addressed by.
    fn id(&self) -> AgentId;

    /// Process one envelope, optionally producing follow-up envelopes.
    async fn handle(&self, envelope: AgentEnvelope) -> Result<Vec<AgentEnvelope>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mailbox
// ─────────────────────────────────────────────────────────────────────────────

struct Queued {
    priority: Priority,
    seq: u64,
    envelope: AgentEnvelope,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Max-heap: higher band first, then earlier sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

struct Mailbox {
    queue: Mutex<BinaryHeap<Queued>>,
    notify: Notify,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
        }
    }

    fn push(&self, envelope: AgentEnvelope, seq: u64) {
        self.queue.lock().push(Queued {
            priority: envelope.priority,
            seq,
            envelope,
        });
        self.notify.notify_one();
    }

    async fn next(&self) -> AgentEnvelope {
        loop {
            if let Some(queued) = self.queue.lock().pop() {
                return queued.envelope;
            }
            self.notify.notified().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus
// ─────────────────────────────────────────────────────────────────────────────

struct PendingReply {
    requester: AgentId,
    tx: oneshot::Sender<AgentEnvelope>,
}

struct BusInner {
    mailboxes: DashMap<AgentId, Arc<Mailbox>>,
    pending: DashMap<CorrelationId, PendingReply>,
    /// Correlations whose waiter gave up; late replies land here and are
    /// dropped without delivery.
    closed: DashSet<CorrelationId>,
    seq: AtomicU64,
    shutdown: CancellationToken,
}

impl BusInner {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, AtomicOrdering::Relaxed)
    }

    fn deliver(&self, target: &AgentId, envelope: AgentEnvelope) {
        let seq = self.next_seq();
        match self.mailboxes.get(target) {
            Some(mailbox) => mailbox.push(envelope, seq),
            None => {
                warn!(agent_id = %target, kind = %envelope.kind, "dropping envelope for unregistered agent");
            }
        }
    }

    fn publish(&self, envelope: AgentEnvelope) {
        match envelope.recipient.clone() {
            Recipient::Agent(target) => {
                // The tombstone stays: a correlation may see more than one
                // straggling reply, and every one of them must be dropped.
                if self.closed.contains(&envelope.correlation_id) {
                    debug!(
                        correlation_id = %envelope.correlation_id,
                        kind = %envelope.kind,
                        "dropping reply for closed correlation"
                    );
                    return;
                }
                // A pending entry whose requester matches the recipient means
                // this envelope answers an in-flight request.
                if let Some((_, waiter)) = self
                    .pending
                    .remove_if(&envelope.correlation_id, |_, p| p.requester == target)
                {
                    let _ = waiter.tx.send(envelope);
                    return;
                }
                self.deliver(&target, envelope);
            }
            Recipient::Broadcast => {
                let sender = envelope.sender.clone();
                for entry in &self.mailboxes {
                    if *entry.key() == sender {
                        continue;
                    }
                    let seq = self.next_seq();
                    entry.value().push(envelope.clone(), seq);
                }
            }
        }
    }
}

/// Routes [`AgentEnvelope`]s between registered [`Agent`]s.
pub struct AgentBus {
    inner: Arc<BusInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AgentBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                mailboxes: DashMap::new(),
                pending: DashMap::new(),
                closed: DashSet::new(),
                seq: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register an agent and start its dispatch task.
    ///
    /// Fails with `Conflict` if the agent's id is already taken.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Result<()> {
        let agent_id = agent.id();
        let mailbox = Arc::new(Mailbox::new());
        {
            use dashmap::mapref::entry::Entry;
            match self.inner.mailboxes.entry(agent_id.clone()) {
                Entry::Occupied(_) => {
                    return Err(LanternError::conflict(format!(
                        "agent '{agent_id}' is already registered"
                    )));
                }
                Entry::Vacant(slot) => {
                    let _ = slot.insert(mailbox.clone());
                }
            }
        }
        debug!(agent_id = %agent_id, "agent registered");

        let inner = self.inner.clone();
        let task = tokio::spawn(dispatch_loop(inner, agent, mailbox));
        self.tasks.lock().push(task);
        Ok(())
    }

    /// Enqueue an envelope for delivery.
    #[instrument(skip_all, fields(kind = %envelope.kind, correlation_id = %envelope.correlation_id))]
    pub fn publish(&self, envelope: AgentEnvelope) {
        self.inner.publish(envelope);
    }

    /// Publish a request and await the first reply carrying its correlation
    /// ID, bounded by `timeout`.
    pub async fn request(
        &self,
        envelope: AgentEnvelope,
        timeout: Duration,
    ) -> Result<AgentEnvelope> {
        let correlation_id = envelope.correlation_id.clone();
        let (tx, rx) = oneshot::channel();
        let _ = self.inner.pending.insert(
            correlation_id.clone(),
            PendingReply {
                requester: envelope.sender.clone(),
                tx,
            },
        );
        self.inner.publish(envelope);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_closed)) => Err(LanternError::upstream_with_correlation(
                "bus request cancelled",
                correlation_id.as_str(),
            )),
            Err(_elapsed) => {
                let _ = self.inner.pending.remove(&correlation_id);
                let _ = self.inner.closed.insert(correlation_id.clone());
                Err(LanternError::timeout(
                    "bus request",
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Abandon an in-flight request. A reply arriving afterwards is dropped
    /// silently.
    pub fn cancel(&self, correlation_id: &CorrelationId) {
        if self.inner.pending.remove(correlation_id).is_some() {
            let _ = self.inner.closed.insert(correlation_id.clone());
            debug!(correlation_id = %correlation_id, "request cancelled");
        }
    }

    /// Stop every dispatch task and wait for them to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
    }
}

impl Default for AgentBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch_loop(inner: Arc<BusInner>, agent: Arc<dyn Agent>, mailbox: Arc<Mailbox>) {
    let agent_id = agent.id();
    loop {
        let envelope = tokio::select! {
            () = inner.shutdown.cancelled() => break,
            envelope = mailbox.next() => envelope,
        };

        let correlation_id = envelope.correlation_id.clone();
        let reply_to = envelope.sender.clone();
        let priority = envelope.priority;

        match agent.handle(envelope).await {
            Ok(outgoing) => {
                for out in outgoing {
                    inner.publish(out);
                }
            }
            Err(e) => {
                // The requester still gets an answer; the bus stays up.
                warn!(agent_id = %agent_id, correlation_id = %correlation_id, error = %e, "agent handler failed");
                inner.publish(AgentEnvelope {
                    sender: agent_id.clone(),
                    recipient: Recipient::Agent(reply_to),
                    priority,
                    kind: KIND_AGENT_FAILED.into(),
                    payload: json!({ "detail": e.to_string() }),
                    correlation_id,
                });
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
