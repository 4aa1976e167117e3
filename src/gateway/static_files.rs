//! Static file serving for the bundled web client.
//!
//! Files come from `gateway.static_dir` on disk; `/` maps to `index.html`.

use std::path::Path;
use tower_http::services::ServeDir;

/// Pass-through file service used as the router fallback.
pub fn static_service(dir: &Path) -> ServeDir {
    ServeDir::new(dir).append_index_html_on_directories(true)
}
