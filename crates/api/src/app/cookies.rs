//! `Set-Cookie` values for the session token.
//!
//! The token is also returned in the response body; browsers on the same
//! site use the cookie, embedded/cross-origin clients use the body token as a
//! bearer.

use chrono::{DateTime, Utc};

use tenantry_auth::SESSION_LIFETIME_HOURS;

const MAX_AGE_SECS: i64 = SESSION_LIFETIME_HOURS * 3600;

pub fn session_cookie(name: &str, token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!("{name}={token}; HttpOnly; SameSite=Lax; Path=/; Expires={expires}; Max-Age={MAX_AGE_SECS}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn cleared_cookie(name: &str, secure: bool) -> String {
    let mut cookie = format!("{name}=; HttpOnly; SameSite=Lax; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
