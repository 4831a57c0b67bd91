use crate::http::request::{Method, Request};
use crate::http::response::{Reply, Response};
use crate::notes::api::{ApiError, NotesApi, API_PREFIX};
use crate::static_files::StaticAssets;

/// Dispatches on the path with the query string removed.
///
/// Bare `/api` and `/api/`-prefixed paths go to the notes API, which answers
/// 404 for `/api` itself. Any other path is a static asset for GET and 405
/// for every other method. `/apiary` is a static path.
#[derive(Debug, Clone)]
pub struct Router {
    api: NotesApi,
    assets: StaticAssets,
}

impl Router {
    pub fn new(api: NotesApi, assets: StaticAssets) -> Self {
        Self { api, assets }
    }

    pub fn handle(&self, req: &Request) -> Result<Reply, ApiError> {
        let route = req.route();
        if route == API_PREFIX || route.starts_with("/api/") {
            return self.api.handle(req);
        }

        Ok(match req.method {
            Method::GET => self.assets.serve(route).into(),
            _ => Response::method_not_allowed().into(),
        })
    }
}
