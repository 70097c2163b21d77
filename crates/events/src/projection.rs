use crate::EventEnvelope;

/// A projection builds a read model from an append-only event stream.
///
/// Projections here are **pure reducers**: `apply` consumes the current value
/// and returns the next one. Nothing is shared between readers; every replay
/// starts from its own initial value, so independent readers can fold the
/// same stream concurrently.
///
/// ## Idempotency
///
/// Projections must be **idempotent**: applying the same envelope again must
/// return an equal value. This is what makes at-least-once delivery and full
/// replays safe. The usual strategy is event ID deduplication.
///
/// ## Disposability
///
/// Read models are **disposable**: they can be rebuilt from the log at any
/// time. The log is the source of truth; projections are derived values.
pub trait Projection: Sized {
    /// Fold a single envelope into the read model.
    ///
    /// Envelopes that are irrelevant to this projection are ignored. This
    /// method never fails: anything malformed was rejected when the envelope
    /// was constructed.
    fn apply(self, envelope: &EventEnvelope) -> Self;

    /// Fold a whole stream, in order.
    fn fold<'a, I>(self, envelopes: I) -> Self
    where
        I: IntoIterator<Item = &'a EventEnvelope>,
    {
        envelopes.into_iter().fold(self, Self::apply)
    }
}
