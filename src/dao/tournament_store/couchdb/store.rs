use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    models::{PlayerEntryEntity, PlayerPatch, StatePatch, TournamentStateEntity},
    storage::StorageResult,
    tournament_store::{ChangeFeed, StoreChange, TournamentStore},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, ChangesResponse, DatabaseInfo, CouchPlayerDocument, CouchStateDocument, END_SUFFIX,
        PLAYER_PREFIX, STATE_PREFIX, player_doc_id, seq_token, state_doc_id, strip_meta,
    },
};

const CHANGES: &str = "_changes";
const LONGPOLL_TIMEOUT_MS: &str = "25000";
const FEED_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_CONFLICT_RETRIES: usize = 3;

#[derive(Clone)]
pub struct CouchTournamentStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchTournamentStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<()> {
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn player_documents(&self, state_id: Uuid) -> CouchResult<Vec<CouchPlayerDocument>> {
        let mut docs = self
            .list_documents::<CouchPlayerDocument>(PLAYER_PREFIX)
            .await?;
        docs.retain(|doc| doc.entry.state_id == state_id);
        docs.sort_by_key(|doc| doc.entry.created_at);
        Ok(docs)
    }

    async fn roster_rows(&self, state_id: Uuid) -> CouchResult<Vec<Value>> {
        let docs = self.player_documents(state_id).await?;
        docs.into_iter()
            .map(|doc| {
                serde_json::to_value(doc.entry).map_err(|source| CouchDaoError::DeserializeValue {
                    path: PLAYER_PREFIX.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Sequence of the latest write, used as the starting point of a feed.
    async fn current_seq(&self) -> CouchResult<String> {
        let database = self.database.to_string();
        let url = self.database_url();
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::DatabaseStatus {
                database,
                status: response.status(),
            });
        }

        let info = response
            .json::<DatabaseInfo>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse { path: url, source })?;
        Ok(seq_token(&info.update_seq))
    }

    async fn poll_changes(&self, since: &str) -> CouchResult<ChangesResponse> {
        let response = self
            .request(Method::GET, CHANGES)
            .query(&[
                ("feed", "longpoll"),
                ("include_docs", "true"),
                ("timeout", LONGPOLL_TIMEOUT_MS),
                ("since", since),
            ])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES.to_string(),
                source,
            })
    }

    /// Long-poll `_changes` from `since`, yielding state rows and roster snapshots.
    fn follow_changes(&self, state_id: Uuid, since: String) -> ChangeFeed {
        let store = self.clone();
        let state_doc = state_doc_id(state_id);
        let owner = state_id.to_string();

        Box::pin(async_stream::stream! {
            let mut since = since;
            loop {
                let response = match store.poll_changes(&since).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "CouchDB change feed poll failed; retrying");
                        sleep(FEED_RETRY_DELAY).await;
                        continue;
                    }
                };
                since = seq_token(&response.last_seq);

                let mut roster_touched = false;
                for row in response.results {
                    if row.id == state_doc {
                        if let Some(map) = row.doc.and_then(strip_meta) {
                            yield StoreChange::State(map);
                        }
                    } else if row.id.starts_with(PLAYER_PREFIX) {
                        let ours = row
                            .doc
                            .as_ref()
                            .and_then(|doc| doc.get("state_id"))
                            .and_then(Value::as_str)
                            == Some(owner.as_str());
                        roster_touched |= row.deleted || ours;
                    }
                }

                if roster_touched {
                    match store.roster_rows(state_id).await {
                        Ok(rows) => {
                            yield StoreChange::Roster(rows);
                        }
                        Err(err) => warn!(error = %err, "failed to reload roster after change"),
                    }
                }
            }
        })
    }

    async fn patch_state(&self, id: Uuid, patch: &StatePatch) -> CouchResult<()> {
        let doc_id = state_doc_id(id);
        let mut attempt = 0;
        loop {
            let Some(mut doc) = self.get_document::<CouchStateDocument>(&doc_id).await? else {
                return Err(CouchDaoError::MissingDocument { doc_id });
            };
            patch.apply_to(&mut doc.state);
            match self.put_document(&doc_id, &doc).await {
                Err(CouchDaoError::RequestStatus {
                    status: StatusCode::CONFLICT,
                    ..
                }) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(doc_id = %doc_id, attempt, "revision conflict on state write; retrying");
                }
                other => return other,
            }
        }
    }
}

impl TournamentStore for CouchTournamentStore {
    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<TournamentStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchStateDocument>(STATE_PREFIX)
                .await?;
            Ok(docs
                .into_iter()
                .map(|doc| doc.state)
                .max_by_key(|state| state.updated_at))
        })
    }

    fn create_state(&self, state: TournamentStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchStateDocument::from((state, None));
            store.put_document(&doc.id, &doc).await.map_err(Into::into)
        })
    }

    fn write_partial(&self, id: Uuid, patch: StatePatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.patch_state(id, &patch).await.map_err(Into::into) })
    }

    fn list_players(
        &self,
        state_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store.player_documents(state_id).await?;
            Ok(docs.into_iter().map(|doc| doc.entry).collect())
        })
    }

    fn insert_player(&self, entry: PlayerEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = player_doc_id(entry.id);
            let rev = store
                .get_document::<CouchPlayerDocument>(&doc_id)
                .await?
                .and_then(|existing| existing.rev);
            let doc = CouchPlayerDocument::from((entry, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn update_player(
        &self,
        entry_id: Uuid,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = player_doc_id(entry_id);
            let Some(mut doc) = store.get_document::<CouchPlayerDocument>(&doc_id).await? else {
                return Ok(());
            };
            patch.apply_to(&mut doc.entry);
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_player(&self, entry_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = player_doc_id(entry_id);
            let Some(doc) = store.get_document::<CouchPlayerDocument>(&doc_id).await? else {
                return Ok(());
            };
            match doc.rev {
                Some(rev) => store.delete_document(&doc_id, &rev).await.map_err(Into::into),
                None => Ok(()),
            }
        })
    }

    fn delete_players(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            for doc in store.player_documents(state_id).await? {
                if let Some(rev) = doc.rev.as_deref() {
                    store.delete_document(&doc.id, rev).await?;
                }
            }
            Ok(())
        })
    }

    fn subscribe(&self, state_id: Uuid) -> BoxFuture<'static, StorageResult<ChangeFeed>> {
        let store = self.clone();
        Box::pin(async move {
            let since = store.current_seq().await?;
            debug!(since = %since, "change feed anchored");
            Ok(store.follow_changes(state_id, since))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
