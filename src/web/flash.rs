//! One-shot messages carried across a redirect in a cookie

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Cookie holding the pending flash code
pub const FLASH_COOKIE: &str = "flash";

/// Messages that survive a redirect back to the index page.
///
/// Only a short code is stored client-side; the text lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    MissingFields,
}

impl Flash {
    fn code(self) -> &'static str {
        match self {
            Flash::MissingFields => "missing_fields",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "missing_fields" => Some(Flash::MissingFields),
            _ => None,
        }
    }

    /// Text shown to the user
    pub fn message(self) -> &'static str {
        match self {
            Flash::MissingFields => "Please fill out all required fields.",
        }
    }

    /// Bootstrap alert class for the message
    pub fn category(self) -> &'static str {
        match self {
            Flash::MissingFields => "warning",
        }
    }

    /// Add this flash to the outgoing cookies
    pub fn store(self, jar: CookieJar) -> CookieJar {
        jar.add(flash_cookie(self.code()))
    }

    /// Pending flash, if any; the returned jar removes the cookie
    pub fn take(jar: CookieJar) -> (CookieJar, Option<Self>) {
        let Some(cookie) = jar.get(FLASH_COOKIE) else {
            return (jar, None);
        };
        let flash = Self::from_code(cookie.value());
        (jar.remove(flash_cookie("")), flash)
    }
}

fn flash_cookie(value: &'static str) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_reads_and_removes_flash() {
        let jar = CookieJar::new()
            .add(Cookie::new("theme", "dark"))
            .add(Cookie::new(FLASH_COOKIE, "missing_fields"));

        let (jar, flash) = Flash::take(jar);
        assert_eq!(flash, Some(Flash::MissingFields));
        assert!(jar.get(FLASH_COOKIE).is_none());
        assert!(jar.get("theme").is_some());
    }

    #[test]
    fn test_unknown_flash_is_ignored_but_cleared() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "<script>"));
        let (jar, flash) = Flash::take(jar);
        assert_eq!(flash, None);
        assert!(jar.get(FLASH_COOKIE).is_none());

        let (_, flash) = Flash::take(CookieJar::new());
        assert_eq!(flash, None);
    }

    #[test]
    fn test_store_then_take() {
        let jar = Flash::MissingFields.store(CookieJar::new());
        let cookie = jar.get(FLASH_COOKIE).unwrap();
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));

        let (_, flash) = Flash::take(jar);
        assert_eq!(flash, Some(Flash::MissingFields));
    }
}
