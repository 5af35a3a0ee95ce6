use futures_util::{stream::BoxStream, Stream};
use ontol_runtime::{query::select::EntitySelect, row::Row};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult};

/// Operation sequence number (within one transaction)
pub type OpSequence = u32;

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum ReqMessage {
    /// Query for output elements
    Query(OpSequence, EntitySelect),
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum RespMessage {
    /// Marks the start of a new output sequence.
    /// The subsequent Element messages are the elements of that sequence.
    SequenceStart(OpSequence),
    Element(Row),
    SequenceEnd(OpSequence),
}

/// The complete output of one query operation.
#[derive(Clone, PartialEq, Debug)]
pub struct RowSequence {
    pub op_seq: OpSequence,
    pub rows: Vec<Row>,
}

pub trait AccumulateSequences<'a> {
    fn accumulate_sequences(self) -> impl Stream<Item = DomainResult<RowSequence>> + 'a;
}

impl<'a> AccumulateSequences<'a> for BoxStream<'a, DomainResult<RespMessage>> {
    fn accumulate_sequences(self) -> impl Stream<Item = DomainResult<RowSequence>> + 'a {
        async_stream::try_stream! {
            let mut current: Option<RowSequence> = None;

            for await resp_message in self {
                match resp_message? {
                    RespMessage::SequenceStart(op_seq) => {
                        if current.is_some() {
                            Err(DomainError::data_store("sequence started before the previous one ended"))?;
                        }
                        current = Some(RowSequence { op_seq, rows: vec![] });
                    }
                    RespMessage::Element(row) => {
                        match &mut current {
                            Some(current) => current.rows.push(row),
                            None => Err(DomainError::data_store("element outside of sequence"))?,
                        }
                    }
                    RespMessage::SequenceEnd(op_seq) => {
                        match current.take() {
                            Some(current) if current.op_seq == op_seq => {
                                yield current;
                            }
                            _ => Err(DomainError::data_store("unbalanced sequence end"))?,
                        }
                    }
                }
            }

            if current.is_some() {
                Err(DomainError::data_store("sequence did not end"))?;
            }
        }
    }
}
