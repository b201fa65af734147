//! Per-session state
//!
//! A [`Session`] owns the conversation log, the single active data store and
//! the credential. Every operation goes through `&mut Session`; nothing is
//! global.

use crate::agent::{AgentFault, AgentRequest, AnsweringAgent};
use crate::config::Config;
use crate::conversation::{ChatTurn, Conversation};
use crate::credential::Credential;
use crate::error::Result;
use crate::store::{self, DataStoreHandle, StoreSource, TabularIngestor};
use std::path::{Path, PathBuf};
use tracing::Instrument;
use uuid::Uuid;

/// Shown when a question arrives before any data source is configured
pub const NO_STORE_MESSAGE: &str = "Please upload a CSV or provide a database engine URL first.";

/// Data source settings submitted together
///
/// An uploaded file takes precedence: the connection descriptor is only
/// evaluated when no file is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationUpdate {
    /// CSV file to ingest
    pub csv: Option<PathBuf>,
    /// Connection descriptor to open
    pub connection: Option<String>,
}

impl ConfigurationUpdate {
    /// Returns true when the update names no data source
    pub fn is_empty(&self) -> bool {
        self.csv.is_none() && self.connection.is_none()
    }
}

/// Result of submitting a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The agent answered; both turns were appended
    Answered(String),
    /// No store is active; nothing was appended and the agent was not called
    NoActiveStore(String),
    /// The agent failed; the user turn was appended without an answer
    Faulted(AgentFault),
}

/// One interactive session
pub struct Session {
    id: Uuid,
    conversation: Conversation,
    store: Option<DataStoreHandle>,
    credential: Option<Credential>,
    ingestor: TabularIngestor,
    history_window: usize,
}

impl Session {
    /// Start a session; the log is seeded with the configured greeting
    pub fn new(config: &Config) -> Self {
        let mut conversation = Conversation::new();
        if !config.chat.greeting.is_empty() {
            conversation.append(ChatTurn::assistant(config.chat.greeting.clone()));
        }

        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "Session started");

        Self {
            id,
            conversation,
            store: None,
            credential: None,
            ingestor: TabularIngestor::new(&config.ingest),
            history_window: config.agent.history_window,
        }
    }

    /// Session identifier used in log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The full conversation log
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The active store, if any
    pub fn store(&self) -> Option<&DataStoreHandle> {
        self.store.as_ref()
    }

    /// Origin of the active store, if any
    pub fn store_source(&self) -> Option<&StoreSource> {
        self.store.as_ref().map(DataStoreHandle::source)
    }

    /// Returns true once a credential has been set
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Set or clear the provider credential
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    /// Apply a data source update
    ///
    /// Returns the new store's source when the update replaced the store, or
    /// `None` when it named no data source.
    ///
    /// # Errors
    ///
    /// Returns the ingestion or connection error; the previous store stays
    /// active
    pub async fn apply_configuration(
        &mut self,
        update: &ConfigurationUpdate,
    ) -> Result<Option<&StoreSource>> {
        if let Some(csv) = &update.csv {
            if update.connection.is_some() {
                tracing::debug!("Both a file and a descriptor were given; using the file");
            }
            return self.ingest_file(csv).map(Some);
        }
        if let Some(descriptor) = &update.connection {
            return self.connect(descriptor).await.map(Some);
        }
        Ok(None)
    }

    /// Ingest a CSV file and make it the active store
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Ingest`; the previous store stays active
    pub fn ingest_file(&mut self, path: &Path) -> Result<&StoreSource> {
        let handle = self.ingestor.ingest_path(path)?;
        Ok(self.replace_store(handle))
    }

    /// Open a database and make it the active store
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Connection`; the previous store stays active
    pub async fn connect(&mut self, descriptor: &str) -> Result<&StoreSource> {
        let handle = store::connect(descriptor).await?;
        Ok(self.replace_store(handle))
    }

    fn replace_store(&mut self, handle: DataStoreHandle) -> &StoreSource {
        if let Some(previous) = self.store.take() {
            tracing::info!(session = %self.id, previous = %previous.source(), "Releasing previous store");
        }
        tracing::info!(session = %self.id, store = %handle.source(), "Active store replaced");
        self.store.insert(handle).source()
    }

    /// Submit a user message and wait for the answer
    ///
    /// The agent sees at most `history_window` turns preceding the question.
    pub async fn submit(&mut self, agent: &dyn AnsweringAgent, text: &str) -> TurnOutcome {
        let Some(store) = self.store.as_ref() else {
            tracing::debug!(session = %self.id, "Question submitted without an active store");
            return TurnOutcome::NoActiveStore(NO_STORE_MESSAGE.to_string());
        };

        let history: Vec<ChatTurn> = self.conversation.window(self.history_window).to_vec();
        let request = AgentRequest {
            question: text,
            history: &history,
            store,
            credential: self.credential.as_ref(),
        };
        let span = tracing::info_span!("turn", session = %self.id, turn = self.conversation.len());
        let result = agent.answer(request).instrument(span).await;

        self.conversation.append(ChatTurn::user(text));
        match result {
            Ok(answer) => {
                self.conversation.append(ChatTurn::assistant(answer.clone()));
                TurnOutcome::Answered(answer)
            }
            Err(fault) => TurnOutcome::Faulted(fault),
        }
    }
}
