#![forbid(unsafe_code)]

//! A data store keeping all entities in memory.
//!
//! It answers polymorphic queries by scanning the tables of every selected variant.

use std::sync::Arc;

use domain_engine_core::{
    data_store::DataStoreAPI,
    transact::{ReqMessage, RespMessage},
    DomainResult, Session,
};
use futures_util::{stream::BoxStream, StreamExt};
use ontol_runtime::ontology::Ontology;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::InMemoryStore;

pub use crate::core::{EntityAttr, EntityData, VertexKey};

mod core;
mod filter;
mod query;
mod sort;

pub struct InMemoryDb {
    store: RwLock<InMemoryStore>,
    ontology: Arc<Ontology>,
}

#[async_trait::async_trait]
impl DataStoreAPI for InMemoryDb {
    async fn transact<'a>(
        &'a self,
        messages: BoxStream<'a, DomainResult<ReqMessage>>,
        session: Session,
    ) -> DomainResult<BoxStream<'a, DomainResult<RespMessage>>> {
        self.transact_inner(messages, session).await
    }
}

impl InMemoryDb {
    pub fn new(ontology: Arc<Ontology>) -> Self {
        Self {
            store: RwLock::new(InMemoryStore::new(&ontology)),
            ontology,
        }
    }

    pub async fn insert(&self, entity: EntityData) -> DomainResult<VertexKey> {
        let key = self.store.write().await.insert(entity, &self.ontology)?;
        debug!("inserted {key:?}");
        Ok(key)
    }

    async fn transact_inner<'a>(
        &'a self,
        messages: BoxStream<'a, DomainResult<ReqMessage>>,
        _session: Session,
    ) -> DomainResult<BoxStream<'a, DomainResult<RespMessage>>> {
        Ok(async_stream::try_stream! {
            let store = self.store.read().await;

            for await req in messages {
                match req? {
                    ReqMessage::Query(op_seq, select) => {
                        let rows = store.query_entities(&select, &self.ontology)?;

                        yield RespMessage::SequenceStart(op_seq);

                        for row in rows {
                            yield RespMessage::Element(row);
                        }

                        yield RespMessage::SequenceEnd(op_seq);
                    }
                }
            }
        }
        .boxed())
    }
}
