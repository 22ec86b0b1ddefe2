//! Cookies

use mockall::automock;

/// Read-only access to the request's cookies.
#[automock]
pub trait CookieReader {
    /// Value of the cookie called `name`, if the browser sent one.
    fn get_cookie(&self, name: &str) -> Option<String>;
}

impl<T: CookieReader + ?Sized> CookieReader for &T {
    fn get_cookie(&self, name: &str) -> Option<String> {
        (**self).get_cookie(name)
    }
}
