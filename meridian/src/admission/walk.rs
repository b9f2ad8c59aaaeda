// Copyright (c) 2024 Botho Foundation

use super::AdmissionError;
use crate::types::{AnyMessage, Message, MessageError};

pub(crate) enum WalkError<E> {
    /// An execution wrapper nests deeper than allowed.
    TooDeep,
    Undecodable(MessageError),
    Visit(E),
}

/// Map a failed walk whose visitor reports [`AdmissionError`]s.
pub(crate) fn walk_error(
    err: WalkError<AdmissionError>,
    max_depth: usize,
    height: u64,
) -> AdmissionError {
    match err {
        WalkError::TooDeep => AdmissionError::NestingTooDeep { max_depth, height },
        WalkError::Undecodable(err) => AdmissionError::TxDecode(err.to_string()),
        WalkError::Visit(err) => err,
    }
}

/// Visit every message, descending into execution wrappers.
///
/// Top-level messages are at depth 0. Anything deeper than `max_depth` fails the
/// walk with [`WalkError::TooDeep`] before it is visited.
pub(crate) fn walk_messages<E, F>(
    msgs: &[AnyMessage],
    max_depth: usize,
    visit: &mut F,
) -> Result<(), WalkError<E>>
where
    F: FnMut(&AnyMessage, &Message) -> Result<(), E>,
{
    walk_at(msgs, 0, max_depth, visit)
}

fn walk_at<E, F>(
    msgs: &[AnyMessage],
    depth: usize,
    max_depth: usize,
    visit: &mut F,
) -> Result<(), WalkError<E>>
where
    F: FnMut(&AnyMessage, &Message) -> Result<(), E>,
{
    if depth > max_depth {
        return Err(WalkError::TooDeep);
    }
    for any in msgs {
        let msg = any.unpack().map_err(WalkError::Undecodable)?;
        visit(any, &msg).map_err(WalkError::Visit)?;
        if let Message::Exec { msgs: inner, .. } = &msg {
            walk_at(inner, depth + 1, max_depth, visit)?;
        }
    }
    Ok(())
}
