//! Directory session seam
//!
//! The discovery engine never binds or connects on its own. It is handed an
//! already-authenticated session implementing [`DirectorySession`] and issues
//! paged searches through it.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::operation::{PageCookie, SearchPage, SearchRequest};

/// An authenticated directory session capable of paged searches.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Default naming context of the bound domain (e.g. `DC=corp,DC=local`).
    fn default_naming_context(&self) -> &str;

    /// Fetch one page of results.
    ///
    /// The first call passes [`PageCookie::initial`]; each following call passes
    /// the cookie from the previous page until a page reports no successor.
    ///
    /// A search base that does not exist must be reported as
    /// [`DirectoryError::NoSuchObject`](crate::error::DirectoryError::NoSuchObject).
    async fn search_page(
        &self,
        request: &SearchRequest,
        cookie: PageCookie,
    ) -> DirectoryResult<SearchPage>;
}

#[async_trait]
impl<T: DirectorySession + ?Sized> DirectorySession for &T {
    fn default_naming_context(&self) -> &str {
        (**self).default_naming_context()
    }

    async fn search_page(
        &self,
        request: &SearchRequest,
        cookie: PageCookie,
    ) -> DirectoryResult<SearchPage> {
        (**self).search_page(request, cookie).await
    }
}

#[async_trait]
impl<T: DirectorySession + ?Sized> DirectorySession for Box<T> {
    fn default_naming_context(&self) -> &str {
        (**self).default_naming_context()
    }

    async fn search_page(
        &self,
        request: &SearchRequest,
        cookie: PageCookie,
    ) -> DirectoryResult<SearchPage> {
        (**self).search_page(request, cookie).await
    }
}
