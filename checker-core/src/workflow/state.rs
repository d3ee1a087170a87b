//! Workflow state and its read-only view.

use crate::reactive::{Memo, Signal};
use crate::store::StateMap;

use super::diff::DiffSegment;
use super::grading::is_correct;
use super::history::HistoryEntry;

/// Read-only view of the practice workflow.
///
/// Every getter is tracked: calling it inside a selection, memo or effect
/// makes that computation re-run when the value changes. Only
/// [`Workflow`](super::Workflow) methods can write.
#[derive(Clone)]
pub struct WorkflowState {
    pub(super) text: Signal<String>,
    pub(super) checking: Signal<bool>,
    pub(super) results: Signal<String>,
    pub(super) correct: Memo<bool>,
    pub(super) suggestions: Signal<Option<Vec<DiffSegment>>>,
    pub(super) feedback: Signal<String>,
    pub(super) feedback_open: Signal<bool>,
    pub(super) feedback_loading: Signal<bool>,
    pub(super) translation: Signal<String>,
    pub(super) thinking: Signal<bool>,
    pub(super) history: Signal<Vec<HistoryEntry>>,
}

impl WorkflowState {
    pub(super) fn new(history: Vec<HistoryEntry>) -> Self {
        let text = Signal::new(String::new());
        let results = Signal::new(String::new());

        let correct = {
            let (text, results) = (text.clone(), results.clone());
            Memo::new(move || text.with(|t| results.with(|r| is_correct(t, r))))
        };

        Self {
            text,
            checking: Signal::new(false),
            results,
            correct,
            suggestions: Signal::new(None),
            feedback: Signal::new(String::new()),
            feedback_open: Signal::new(false),
            feedback_loading: Signal::new(false),
            translation: Signal::new(String::new()),
            thinking: Signal::new(false),
            history: Signal::new(history),
        }
    }

    /// Store field declarations. `correct` is the only derived field.
    pub(super) fn fields(&self) -> StateMap {
        StateMap::new()
            .mutable("text", &self.text)
            .mutable("checking", &self.checking)
            .mutable("results", &self.results)
            .derived("correct", &self.correct)
            .mutable("suggestions", &self.suggestions)
            .mutable("feedback", &self.feedback)
            .mutable("feedbackOpen", &self.feedback_open)
            .mutable("feedbackLoading", &self.feedback_loading)
            .mutable("translation", &self.translation)
            .mutable("thinking", &self.thinking)
            .mutable("history", &self.history)
    }

    /// The learner's current text.
    pub fn text(&self) -> String {
        self.text.get()
    }

    /// Whether a grammar check or translation is running.
    pub fn checking(&self) -> bool {
        self.checking.get()
    }

    /// The last reply of the grammar service.
    pub fn results(&self) -> String {
        self.results.get()
    }

    /// Whether the last reply confirms the text.
    pub fn correct(&self) -> bool {
        self.correct.get()
    }

    /// Word diff between the text and the last reply, if both are present.
    pub fn suggestions(&self) -> Option<Vec<DiffSegment>> {
        self.suggestions.get()
    }

    pub fn feedback(&self) -> String {
        self.feedback.get()
    }

    pub fn feedback_open(&self) -> bool {
        self.feedback_open.get()
    }

    pub fn feedback_loading(&self) -> bool {
        self.feedback_loading.get()
    }

    pub fn translation(&self) -> String {
        self.translation.get()
    }

    /// Whether a question or answer is being generated.
    pub fn thinking(&self) -> bool {
        self.thinking.get()
    }

    /// The practice conversation, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.get()
    }

    /// The most recent entry, if it is a posed question.
    pub fn pending_question(&self) -> Option<String> {
        self.history.with(|history| {
            history
                .last()
                .filter(|entry| entry.is_question())
                .map(|entry| entry.contents.clone())
        })
    }
}
