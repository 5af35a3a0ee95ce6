use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt};
use ontol_runtime::{ontology::Ontology, query::select::EntitySelect, row::Row};
use tracing::{debug, trace};

use crate::{
    data_store::DataStore,
    domain_error::{DomainErrorKind, DomainResult},
    transact::{AccumulateSequences, OpSequence, ReqMessage, RowSequence},
    Config, DomainError, Session,
};

pub struct DomainEngine {
    ontology: Arc<Ontology>,
    config: Arc<Config>,
    data_store: Option<DataStore>,
}

impl DomainEngine {
    pub fn builder(ontology: Arc<Ontology>) -> Builder {
        Builder {
            ontology,
            config: None,
            data_store: None,
        }
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_data_store(&self) -> DomainResult<&DataStore> {
        self.data_store
            .as_ref()
            .ok_or_else(|| DomainErrorKind::NoDataStore.into_error())
    }

    /// Run a batch of queries in one data store transaction.
    ///
    /// The output has one row sequence per input select, in input order.
    /// Either every query succeeds or the whole batch fails, partial output is never returned.
    pub async fn query_entities(
        &self,
        selects: Vec<EntitySelect>,
        session: Session,
    ) -> DomainResult<Vec<Vec<Row>>> {
        let data_store = self.get_data_store()?;
        let expected_len = selects.len();

        for (op_seq, select) in selects.iter().enumerate() {
            trace!("query {op_seq}: {select:?}");
        }

        let messages = futures_util::stream::iter(
            selects
                .into_iter()
                .enumerate()
                .map(|(op_seq, select)| Ok(ReqMessage::Query(op_seq as OpSequence, select))),
        )
        .boxed();

        debug!("transact {expected_len} queries");

        let sequences: Vec<RowSequence> = data_store
            .api()
            .transact(messages, session)
            .await?
            .accumulate_sequences()
            .try_collect()
            .await?;

        let mut output: Vec<Option<Vec<Row>>> = vec![None; expected_len];

        for RowSequence { op_seq, rows } in sequences {
            let slot = output.get_mut(op_seq as usize).ok_or_else(|| {
                DomainError::data_store(format!("response to unknown query {op_seq}"))
            })?;
            if slot.replace(rows).is_some() {
                return Err(DomainError::data_store(format!(
                    "query {op_seq} answered twice"
                )));
            }
        }

        let output: Vec<Vec<Row>> = output
            .into_iter()
            .enumerate()
            .map(|(op_seq, rows)| {
                rows.ok_or_else(|| {
                    DomainError::data_store(format!("query {op_seq} was not answered"))
                })
            })
            .collect::<DomainResult<_>>()?;

        debug!(
            "transact produced {} rows",
            output.iter().map(Vec::len).sum::<usize>()
        );

        Ok(output)
    }
}

pub struct Builder {
    ontology: Arc<Ontology>,
    config: Option<Config>,
    data_store: Option<DataStore>,
}

impl Builder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn data_store(mut self, data_store: DataStore) -> Self {
        self.data_store = Some(data_store);
        self
    }

    pub fn build(self) -> DomainEngine {
        DomainEngine {
            ontology: self.ontology,
            config: Arc::new(self.config.unwrap_or_default()),
            data_store: self.data_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures_util::stream::BoxStream;
    use ontol_runtime::{query::select::StructSelect, DefId, DefIdSet};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        data_store::DataStoreAPI, domain_error::ErrorCategory, transact::RespMessage,
    };

    /// Answers every query with one empty row of the selected type,
    /// optionally failing after the first query.
    struct EchoStore {
        calls: AtomicUsize,
        fail_second: bool,
    }

    #[async_trait::async_trait]
    impl DataStoreAPI for EchoStore {
        async fn transact<'a>(
            &'a self,
            messages: BoxStream<'a, DomainResult<ReqMessage>>,
            _session: Session,
        ) -> DomainResult<BoxStream<'a, DomainResult<RespMessage>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail_second = self.fail_second;

            Ok(async_stream::try_stream! {
                for await message in messages {
                    let ReqMessage::Query(op_seq, select) = message?;
                    if fail_second && op_seq == 1 {
                        Err(DomainError::data_store("boom"))?;
                    }
                    yield RespMessage::SequenceStart(op_seq);
                    yield RespMessage::Element(Row::new(select.source.def_id));
                    yield RespMessage::SequenceEnd(op_seq);
                }
            }
            .boxed())
        }
    }

    fn engine(store: Arc<EchoStore>) -> DomainEngine {
        DomainEngine::builder(Arc::new(Ontology::builder().build().unwrap()))
            .data_store(DataStore::new(store))
            .build()
    }

    fn select(def_id: DefId) -> EntitySelect {
        StructSelect::new(def_id, DefIdSet::from_iter([def_id])).into_entity_select()
    }

    #[tokio::test]
    async fn batch_is_one_transaction() {
        let store = Arc::new(EchoStore {
            calls: AtomicUsize::new(0),
            fail_second: false,
        });
        let output = engine(store.clone())
            .query_entities(vec![select(DefId(3)), select(DefId(4))], Session::default())
            .await
            .unwrap();

        assert_eq!(1, store.calls.load(Ordering::SeqCst));
        assert_eq!(
            vec![vec![Row::new(DefId(3))], vec![Row::new(DefId(4))]],
            output
        );
    }

    #[tokio::test]
    async fn failure_discards_the_whole_batch() {
        let store = Arc::new(EchoStore {
            calls: AtomicUsize::new(0),
            fail_second: true,
        });
        let error = engine(store)
            .query_entities(vec![select(DefId(3)), select(DefId(4))], Session::default())
            .await
            .unwrap_err();

        assert_eq!(ErrorCategory::BackendExecutionError, error.category());
    }

    #[tokio::test]
    async fn missing_data_store() {
        let engine = DomainEngine::builder(Arc::new(Ontology::builder().build().unwrap())).build();
        let error = engine
            .query_entities(vec![], Session::default())
            .await
            .unwrap_err();

        assert_eq!("no data store", error.to_string());
    }
}
