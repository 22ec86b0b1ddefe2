//! Application Area

use mockall::automock;

/// Which part of the application is serving the request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AppArea {
    /// Back-office administration
    Admin,

    /// Customer-facing storefront
    Storefront,
}

/// Reports the area of the current request.
#[automock]
pub trait AreaProbe {
    /// Area serving the current request
    fn area(&self) -> AppArea;
}

impl<T: AreaProbe + ?Sized> AreaProbe for &T {
    fn area(&self) -> AppArea {
        (**self).area()
    }
}
