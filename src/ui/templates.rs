// Askama template definitions

use askama::Template;

use crate::gallery::GalleryGroup;
use crate::ui::flash::Notice;

// Gallery home page
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub groups: Vec<GalleryGroup>,
    pub authenticated: bool,
    // Empty string when anonymous (strings instead of Option for templates)
    pub username: String,
    pub notice_kind: String,
    pub notice: String,
}

#[derive(Template)]
#[template(path = "upload.html")]
pub struct UploadTemplate {
    pub notice_kind: String,
    pub notice: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub notice_kind: String,
    pub notice: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub notice_kind: String,
    pub notice: String,
}

/// Flatten an optional notice into the (kind, message) string pair the
/// templates render.
pub fn notice_fields(notice: Option<Notice>) -> (String, String) {
    match notice {
        Some(n) => (n.kind, n.message),
        None => (String::new(), String::new()),
    }
}
