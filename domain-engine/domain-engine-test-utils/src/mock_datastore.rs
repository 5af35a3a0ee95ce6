use domain_engine_core::{
    data_store::DataStoreAPI,
    transact::{ReqMessage, RespMessage},
    DomainResult, Session,
};
use futures_util::{stream::BoxStream, StreamExt};
use unimock::unimock;

/// A non-streaming version of [DataStoreAPI::transact], for mocking.
#[unimock(api = LinearTransactMock)]
pub trait LinearTransact: Send + Sync {
    fn transact(
        &self,
        messages: Vec<DomainResult<ReqMessage>>,
        session: Session,
    ) -> DomainResult<Vec<DomainResult<RespMessage>>>;
}

/// Exposes a [LinearTransact] implementation as a data store.
pub struct LinearDataStoreAdapter<T>(T);

impl<T> LinearDataStoreAdapter<T> {
    pub fn new(inner: T) -> Self {
        Self(inner)
    }
}

#[async_trait::async_trait]
impl<T: LinearTransact> DataStoreAPI for LinearDataStoreAdapter<T> {
    async fn transact<'a>(
        &'a self,
        messages: BoxStream<'a, DomainResult<ReqMessage>>,
        session: Session,
    ) -> DomainResult<BoxStream<'a, DomainResult<RespMessage>>> {
        let messages: Vec<_> = messages.collect().await;
        let responses = self.0.transact(messages, session)?;

        Ok(futures_util::stream::iter(responses).boxed())
    }
}

/// Respond to every query of a transaction with the given rows, by query order.
pub fn respond_queried(
    messages: &[DomainResult<ReqMessage>],
    mut rows: impl FnMut(&ReqMessage) -> Vec<ontol_runtime::row::Row>,
) -> DomainResult<Vec<DomainResult<RespMessage>>> {
    let mut responses = vec![];

    for message in messages {
        let message = message.as_ref().map_err(Clone::clone)?;
        let ReqMessage::Query(op_seq, _) = message;

        responses.push(Ok(RespMessage::SequenceStart(*op_seq)));
        responses.extend(rows(message).into_iter().map(RespMessage::Element).map(Ok));
        responses.push(Ok(RespMessage::SequenceEnd(*op_seq)));
    }

    Ok(responses)
}
