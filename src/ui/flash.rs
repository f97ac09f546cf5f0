//! One-shot flash notices carried in a cookie.
//!
//! Notices survive exactly one redirect: a handler sets the cookie
//! alongside its redirect, the next page takes (and clears) it. The
//! value is base64 so messages with spaces stay cookie-safe.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub const FLASH_COOKIE: &str = "photoshed_flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub message: String,
}

fn set(jar: CookieJar, kind: &str, message: &str) -> CookieJar {
    let value = URL_SAFE_NO_PAD.encode(format!("{}\n{}", kind, message));
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

pub fn success(jar: CookieJar, message: &str) -> CookieJar {
    set(jar, "success", message)
}

pub fn error(jar: CookieJar, message: &str) -> CookieJar {
    set(jar, "error", message)
}

/// Read and clear the pending notice, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let notice = jar
        .get(FLASH_COOKIE)
        .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|decoded| {
            decoded.split_once('\n').map(|(kind, message)| Notice {
                kind: kind.to_string(),
                message: message.to_string(),
            })
        });
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    (jar, notice)
}
