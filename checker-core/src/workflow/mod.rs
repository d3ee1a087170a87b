//! The grammar-practice workflow.
//!
//! [`Workflow`] is the method set of the checker store. It owns the write
//! side of every signal in [`WorkflowState`] and drives the remote
//! services:
//!
//! ```text
//! set_text ─► check_grammar ─► results ─► correct / suggestions
//!                 │
//!                 ├─► ask_feedback / toggle_feedback
//!                 └─► add_to_history ─► new_question ─► suggest_answer
//! ```
//!
//! Two reactive rules run alongside the methods:
//!
//! - clearing the text also clears `results`, `suggestions` and `feedback`,
//!   and closes the feedback panel;
//! - `suggestions` is recomputed asynchronously whenever the text or the
//!   results change, and is `None` unless both are non-empty.
//!
//! Async methods are not serialized against each other. Two overlapping
//! calls of the same method both write their results, in the order their
//! remote calls resolve; a slow early call can overwrite a later one.
//! A remote call that never resolves leaves its loading flag set.

mod diff;
mod grading;
mod history;
mod questions;
mod services;
mod state;

pub use diff::{word_diff, ChangeKind, DiffSegment};
pub use grading::is_correct;
pub use history::{HistoryEntry, Role};
pub use questions::QuestionPool;
pub use services::LanguageServices;
pub use state::WorkflowState;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RemoteServiceError;
use crate::reactive::{AsyncComputed, Effect, Signal};
use crate::store::{load_json, StateMap, Storage, Store, StoreMethods};

use history::push_unique;

/// Languages used by [`Workflow::translate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationPair {
    pub source: String,
    pub target: String,
}

impl Default for TranslationPair {
    fn default() -> Self {
        Self {
            source: "nl".to_string(),
            target: "en".to_string(),
        }
    }
}

/// Builder for a [`Workflow`] and its store fields.
pub struct WorkflowBuilder {
    services: Arc<dyn LanguageServices>,
    questions: QuestionPool,
    translation: TranslationPair,
    history: Option<(Arc<dyn Storage>, String)>,
}

impl WorkflowBuilder {
    /// Use `questions` instead of the built-in pool.
    pub fn questions(mut self, questions: QuestionPool) -> Self {
        self.questions = questions;
        self
    }

    /// Translate between these languages.
    pub fn translation(mut self, translation: TranslationPair) -> Self {
        self.translation = translation;
        self
    }

    /// Load the history from, and keep writing it to, `key` in `storage`.
    pub fn history_storage(mut self, storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        self.history = Some((storage, key.into()));
        self
    }

    /// Create the workflow. The returned map declares its store fields.
    pub fn build(self) -> (StateMap, Workflow) {
        let history = match &self.history {
            Some((storage, key)) => load_json(storage.as_ref(), key),
            None => Vec::new(),
        };
        let state = WorkflowState::new(history);

        let clear_on_empty = {
            let state = state.clone();
            Effect::new(move || {
                if state.text.with(String::is_empty) {
                    state.results.set(String::new());
                    state.suggestions.set(None);
                    state.feedback.set(String::new());
                    state.feedback_open.set(false);
                }
            })
        };

        let diff = {
            let (text, results) = (state.text.clone(), state.results.clone());
            AsyncComputed::with_target(state.suggestions.clone(), move || {
                let (text, results) = (text.get(), results.get());
                async move {
                    (!text.is_empty() && !results.is_empty()).then(|| word_diff(&text, &results))
                }
            })
        };

        let history_sync = self
            .history
            .map(|(storage, key)| sync_history(state.history.clone(), storage, key));

        let fields = state.fields();
        let workflow = Workflow {
            state,
            services: self.services,
            questions: self.questions,
            translation: self.translation,
            diff,
            _clear_on_empty: clear_on_empty,
            _history_sync: history_sync,
        };
        (fields, workflow)
    }
}

fn sync_history(
    history: Signal<Vec<HistoryEntry>>,
    storage: Arc<dyn Storage>,
    key: String,
) -> Effect {
    let primed = AtomicBool::new(false);
    Effect::new(move || {
        let json = history.with(|entries| serde_json::to_string(entries));
        if !primed.swap(true, Ordering::SeqCst) {
            return;
        }
        let result = match json {
            Ok(json) => storage.set(&key, json).map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        if let Err(error) = result {
            tracing::warn!(key = %key, %error, "could not persist history");
        }
    })
}

/// The practice workflow: the only writer of [`WorkflowState`].
pub struct Workflow {
    state: WorkflowState,
    services: Arc<dyn LanguageServices>,
    questions: QuestionPool,
    translation: TranslationPair,
    diff: AsyncComputed<Option<Vec<DiffSegment>>>,
    _clear_on_empty: Effect,
    _history_sync: Option<Effect>,
}

impl Workflow {
    /// Start building a workflow around `services`.
    pub fn builder(services: Arc<dyn LanguageServices>) -> WorkflowBuilder {
        WorkflowBuilder {
            services,
            questions: QuestionPool::default(),
            translation: TranslationPair::default(),
            history: None,
        }
    }

    /// Build a persisted store called `name` around a workflow.
    pub fn store(
        name: impl Into<String>,
        storage: Arc<dyn Storage>,
        builder: WorkflowBuilder,
    ) -> Store<Workflow> {
        Store::persisted(name, storage, || builder.build())
    }

    /// Replace the learner's text.
    pub fn set_text(&self, value: impl Into<String>) {
        self.state.text.set(value.into());
    }

    /// Send the trimmed text to the grammar service and store its reply.
    ///
    /// Does nothing when the text is blank. Opens the feedback panel and
    /// clears the previous reply while the call is running.
    pub async fn check_grammar(&self) -> Result<(), RemoteServiceError> {
        let source = self.state.text.with_untracked(|t| t.trim().to_string());
        if source.is_empty() {
            return Ok(());
        }

        tracing::debug!(chars = source.len(), "checking grammar");
        self.state.checking.set(true);
        self.state.feedback_open.set(true);
        self.state.results.set(String::new());

        let outcome = self.services.correct_grammar(&source).await;
        settle(&self.state.checking, "correct_grammar", outcome, |corrected| {
            self.state.results.set(corrected);
        })
    }

    /// Ask the feedback service about the current text.
    pub async fn ask_feedback(&self) -> Result<(), RemoteServiceError> {
        let text = self.state.text.get_untracked();

        self.state.feedback_loading.set(true);
        let outcome = self.services.feedback(&text).await;
        settle(&self.state.feedback_loading, "feedback", outcome, |feedback| {
            self.state.feedback.set(feedback);
        })
    }

    /// Open or close the feedback panel. It always closes while the text is
    /// empty.
    pub fn toggle_feedback(&self) {
        if self.state.text.with_untracked(String::is_empty) {
            self.state.feedback_open.set(false);
        } else {
            self.state.feedback_open.update(|open| *open = !*open);
        }
    }

    /// Translate the trimmed text. Does nothing when the text is blank.
    pub async fn translate(&self) -> Result<(), RemoteServiceError> {
        let source = self.state.text.with_untracked(|t| t.trim().to_string());
        if source.is_empty() {
            return Ok(());
        }

        self.state.checking.set(true);
        self.state.translation.set(String::new());

        let TranslationPair { source: from, target } = &self.translation;
        let outcome = self.services.translate(&source, from, target).await;
        settle(&self.state.checking, "translate", outcome, |translation| {
            self.state.translation.set(translation);
        })
    }

    /// Record the current text as an answer, unless the history already
    /// holds the same contents. Clears the suggestions either way.
    pub fn add_to_history(&self) {
        let text = self.state.text.get_untracked();
        self.state.history.update(|history| {
            if !push_unique(history, HistoryEntry::user(text)) {
                tracing::debug!("text already in history");
            }
        });
        self.state.suggestions.set(None);
    }

    /// Remove the entry with the same contents as `entry`.
    pub fn remove_message(&self, entry: &HistoryEntry) {
        self.state
            .history
            .update(|history| history.retain(|e| e.contents != entry.contents));
    }

    /// Pose a new question.
    ///
    /// Picks a random pool question that is not in the history yet. Once
    /// the pool is exhausted, asks the remote service for a fresh one; a
    /// reply that is blank or already in the history is dropped.
    pub async fn new_question(&self) -> Result<(), RemoteServiceError> {
        let picked = self.state.history.with_untracked(|history| {
            let used: HashSet<&str> = history.iter().map(|e| e.contents.as_str()).collect();
            self.questions
                .pick_unused(&used, &mut rand::rng())
                .map(str::to_string)
        });

        if let Some(question) = picked {
            tracing::debug!(%question, "posing pool question");
            self.state.history.update(|history| {
                push_unique(history, HistoryEntry::assistant(question));
            });
            return Ok(());
        }

        tracing::debug!("question pool exhausted, asking for a fresh question");
        self.state.thinking.set(true);
        let outcome = self.services.ask_anything().await;
        settle(&self.state.thinking, "ask_anything", outcome, |question| {
            let question = question.trim();
            if question.is_empty() {
                tracing::debug!("generated question is empty");
                return;
            }
            self.state.history.update(|history| {
                if !push_unique(history, HistoryEntry::assistant(question)) {
                    tracing::debug!("generated question already asked");
                }
            });
        })
    }

    /// Suggest an answer to the question that was just posed.
    ///
    /// Does nothing unless the last history entry is a question. A
    /// non-empty suggestion is recorded as an answer and becomes the text.
    pub async fn suggest_answer(&self) -> Result<(), RemoteServiceError> {
        let question = self.state.history.with_untracked(|history| {
            history
                .last()
                .filter(|entry| entry.is_question())
                .map(|entry| entry.contents.clone())
        });
        let Some(question) = question else {
            tracing::debug!("no open question to answer");
            return Ok(());
        };

        self.state.thinking.set(true);
        let outcome = self.services.suggest_answer(&question).await;
        settle(&self.state.thinking, "suggest_answer", outcome, |suggestion| {
            if suggestion.trim().is_empty() {
                return;
            }
            self.state.history.update(|history| {
                push_unique(history, HistoryEntry::user(suggestion.clone()));
            });
            self.state.text.set(suggestion);
            self.state.suggestions.set(None);
        })
    }

    /// Wait for every in-flight suggestions computation to resolve.
    pub async fn settled(&self) {
        self.diff.settled().await;
    }

    /// The question pool in use.
    pub fn questions(&self) -> &QuestionPool {
        &self.questions
    }
}

impl StoreMethods for Workflow {
    type View = WorkflowState;

    fn view(&self) -> WorkflowState {
        self.state.clone()
    }
}

/// Apply a remote outcome, then clear `flag` whether it succeeded or not.
fn settle<T>(
    flag: &Signal<bool>,
    operation: &'static str,
    outcome: Result<T, RemoteServiceError>,
    apply: impl FnOnce(T),
) -> Result<(), RemoteServiceError> {
    let result = outcome.map(apply);
    flag.set(false);
    if let Err(err) = &result {
        tracing::warn!(operation, error = %err, "remote service failed");
    }
    result
}
