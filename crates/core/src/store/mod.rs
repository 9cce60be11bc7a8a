//! Persistence module
//!
//! Whole-file JSON persistence for chat history and team state.

mod history;
mod json_file;

pub use history::HistoryStore;
pub use json_file::JsonFile;
