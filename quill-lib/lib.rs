pub mod cell_buffer;
pub mod config;
pub mod document;
pub mod per_line;
pub mod regex;
pub mod selection;
pub mod timing;
pub mod undo;
pub mod watcher;
