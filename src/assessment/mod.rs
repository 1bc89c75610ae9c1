pub mod context;
pub mod debounce;
pub mod dispatcher;
pub mod fallback;
pub mod interaction;
pub mod prompt;
