//! HTTP request handlers for the web server.

mod events;
mod static_files;

pub use events::{create_event, event_form};
pub use static_files::serve_css;
