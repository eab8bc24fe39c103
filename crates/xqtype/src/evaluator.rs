//! `instance of` and `treat as` over a lazily pulled operand.
//!
//! The evaluator drives three pieces: the [`OccurrenceCounter`] decides cardinality as items
//! arrive, the [`ItemTypeMatcher`] decides each item, and the operand iterator yields items
//! (or the dynamic error raised while producing one). Under [`ConsumptionPolicy::Lazy`] no
//! item beyond the one that decides the verdict is pulled.

use crate::matcher::ItemTypeMatcher;
use crate::model::XdmNode;
use crate::occurrence::{CountState, OccurrenceCounter};
use crate::runtime::{ConsumptionPolicy, DynamicContext, Error, ErrorCode};
use crate::types::{MatchOutcome, SequenceType};
use crate::xdm::{XdmItem, XdmSequence};

/// Why a sequence failed to conform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mismatch {
    TooMany { max: usize },
    TooFew { min: usize, seen: usize },
    Item { position: usize },
}

impl Mismatch {
    fn describe(self, t: &SequenceType) -> String {
        match self {
            Mismatch::TooMany { max } => {
                format!("treat as {t} failed: cardinality mismatch (expected at most {max} items)")
            }
            Mismatch::TooFew { min, seen } => {
                format!("treat as {t} failed: cardinality mismatch (expected at least {min} items, got {seen})")
            }
            Mismatch::Item { position } => {
                format!("treat as {t} failed: item {position} does not match the item type")
            }
        }
    }
}

pub struct SequenceTypeEvaluator<'a, N> {
    ctx: &'a DynamicContext<N>,
    matcher: ItemTypeMatcher<'static>,
}

impl<'a, N: XdmNode> SequenceTypeEvaluator<'a, N> {
    pub fn new(ctx: &'a DynamicContext<N>) -> Self {
        Self {
            ctx,
            matcher: ItemTypeMatcher::default(),
        }
    }

    pub fn policy(&self) -> ConsumptionPolicy {
        self.ctx.policy
    }

    /// `sequence instance of t`.
    ///
    /// A dynamic error raised while pulling an item propagates unchanged. Whether errors in
    /// items that do not affect the verdict are raised depends on the context's policy.
    pub fn instance_of<I>(&self, sequence: I, t: &SequenceType) -> Result<bool, Error>
    where
        I: IntoIterator<Item = Result<XdmItem<N>, Error>>,
    {
        let _scope = self.ctx.enter_scope();
        let verdict = self.run(sequence, t, None)?;
        tracing::debug!(target_type = %t, conforms = verdict.is_none(), "instance of");
        Ok(verdict.is_none())
    }

    /// `sequence treat as t`: the items unchanged, or `XPDY0050` when they do not conform.
    pub fn treat_as<I>(&self, sequence: I, t: &SequenceType) -> Result<XdmSequence<N>, Error>
    where
        I: IntoIterator<Item = Result<XdmItem<N>, Error>>,
    {
        let _scope = self.ctx.enter_scope();
        let mut out = Vec::new();
        match self.run(sequence, t, Some(&mut out))? {
            None => {
                tracing::debug!(target_type = %t, items = out.len(), "treat as");
                Ok(out)
            }
            Some(mismatch) => {
                tracing::debug!(target_type = %t, ?mismatch, "treat as failed");
                Err(Error::dynamic(ErrorCode::XPDY0050, mismatch.describe(t)))
            }
        }
    }

    fn run<I>(
        &self,
        sequence: I,
        t: &SequenceType,
        sink: Option<&mut XdmSequence<N>>,
    ) -> Result<Option<Mismatch>, Error>
    where
        I: IntoIterator<Item = Result<XdmItem<N>, Error>>,
    {
        match self.ctx.policy {
            ConsumptionPolicy::Lazy => self.walk(sequence, t, sink),
            ConsumptionPolicy::Eager => {
                let items = sequence.into_iter().collect::<Result<Vec<_>, _>>()?;
                tracing::trace!(items = items.len(), "operand materialized");
                self.walk(items.into_iter().map(Ok), t, sink)
            }
        }
    }

    fn walk<I>(
        &self,
        sequence: I,
        t: &SequenceType,
        mut sink: Option<&mut XdmSequence<N>>,
    ) -> Result<Option<Mismatch>, Error>
    where
        I: IntoIterator<Item = Result<XdmItem<N>, Error>>,
    {
        let mut counter = OccurrenceCounter::for_sequence_type(t);
        for pulled in sequence {
            let item = pulled?;
            if counter.record_item() == CountState::Violated {
                let (_, max) = t.bounds();
                return Ok(Some(Mismatch::TooMany { max: max.unwrap_or_default() }));
            }
            // the counter rejects every item of empty-sequence(), so only typed types get here
            if let SequenceType::Typed { item: item_type, .. } = t {
                match self.matcher.matches(&item, item_type) {
                    MatchOutcome::Match => {}
                    MatchOutcome::NoMatch => {
                        return Ok(Some(Mismatch::Item { position: counter.seen() }));
                    }
                    MatchOutcome::DynamicError(e) => return Err(e),
                }
            }
            if let Some(out) = sink.as_deref_mut() {
                out.push(item);
            }
        }
        if counter.finish() {
            Ok(None)
        } else {
            let (min, _) = t.bounds();
            Ok(Some(Mismatch::TooFew { min, seen: counter.seen() }))
        }
    }
}
