/// Editor page served when no public directory is configured.
pub const EDITOR_HTML: &str = include_str!("../static/index.html");
