// Copyright (c) 2024 Botho Foundation

use std::collections::BTreeSet;
use tracing::debug;

use super::{
    walk::{walk_messages, WalkError},
    AdmissionError, Gatekeeper, Next,
};
use crate::{
    context::Context,
    types::{AnyMessage, Message, Tx},
};

/// Rejects transactions containing a blocked message kind anywhere in their
/// message tree.
///
/// Kinds are matched exactly. A message that cannot be decoded counts as
/// unsupported.
pub struct MessageFilter {
    blocked: BTreeSet<String>,
    max_depth: usize,
}

impl MessageFilter {
    pub fn new(blocked: impl IntoIterator<Item = String>, max_depth: usize) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
            max_depth,
        }
    }
}

impl Gatekeeper for MessageFilter {
    fn name(&self) -> &'static str {
        "message_filter"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let height = ctx.height();
        let mut visit = |any: &AnyMessage, _: &Message| {
            if self.blocked.contains(&any.kind) {
                debug!(kind = %any.kind, height, "blocked message kind");
                return Err(());
            }
            Ok(())
        };
        let result = walk_messages(&tx.body.messages, self.max_depth, &mut visit);

        match result {
            Ok(()) => next.run(ctx, tx, simulate),
            Err(WalkError::TooDeep) => Err(AdmissionError::NestingTooDeep {
                max_depth: self.max_depth,
                height,
            }),
            Err(WalkError::Undecodable(_) | WalkError::Visit(())) => {
                Err(AdmissionError::UnsupportedMessages { height })
            }
        }
    }
}
