//! Checker Core
//!
//! This crate provides the state core of the DutchChecker grammar-practice
//! tool. It implements:
//!
//! - Reactive primitives (signals, memos, effects, async computeds)
//! - Named stores with snapshot persistence and consumer bindings
//! - The practice workflow: grammar checks, feedback, translation and a
//!   question/answer history driven by remote language services
//!
//! # Architecture
//!
//! - `reactive`: signals and automatic dependency tracking
//! - `store`: field declarations, persistence and bindings
//! - `workflow`: the checker state and the methods that mutate it
//! - `config`: TOML configuration and store construction
//! - `error`: error types shared by the modules above
//!
//! # Example
//!
//! ```rust,ignore
//! use checker_core::config::CheckerConfig;
//!
//! let store = CheckerConfig::default().build_store(services)?;
//!
//! let mut binding = store.bind();
//! let correct = binding.select(|state| state.correct());
//!
//! store.methods().set_text("Ik ben naar huis gegaan");
//! store.methods().check_grammar().await?;
//! println!("correct: {}", correct.get());
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod store;
pub mod workflow;

pub use config::CheckerConfig;
pub use error::{CheckerError, RemoteServiceError};
pub use store::{Binding, Selection, Store};
pub use workflow::{LanguageServices, Workflow, WorkflowState};
