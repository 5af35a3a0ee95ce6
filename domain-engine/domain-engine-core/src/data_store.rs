use std::sync::Arc;

use futures_util::stream::BoxStream;

use crate::{
    domain_error::DomainResult,
    transact::{ReqMessage, RespMessage},
    Session,
};

#[async_trait::async_trait]
pub trait DataStoreAPI {
    /// Transact.
    ///
    /// This is a duplex operation, the input messages are transformed into output messages
    /// as they are executed on the data store.
    async fn transact<'a>(
        &'a self,
        messages: BoxStream<'a, DomainResult<ReqMessage>>,
        session: Session,
    ) -> DomainResult<BoxStream<'a, DomainResult<RespMessage>>>;
}

pub struct DataStore {
    api: Arc<dyn DataStoreAPI + Send + Sync>,
}

impl DataStore {
    pub fn new(api: Arc<dyn DataStoreAPI + Send + Sync>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &(dyn DataStoreAPI + Send + Sync) {
        self.api.as_ref()
    }
}
