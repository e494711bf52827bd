//! Request routing.

use hyper::Method;

pub const FORM_PATH: &str = "/";
pub const GENERATE_PATH: &str = "/generate";

/// Where a request goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// `GET /` or `HEAD /`: the generator form.
    Form,
    /// `POST /generate`: run the pipeline.
    Generate,
    /// `GET /generate`: send the browser back to the form.
    RedirectToForm,
    /// Known path, wrong method. Carries the `Allow` header value.
    MethodNotAllowed(&'static str),
    NotFound,
}

/// Resolve a method and URI path to a route.
#[inline]
pub fn resolve(method: &Method, path: &str) -> Route {
    match path {
        FORM_PATH | "/index.html" => match *method {
            Method::GET | Method::HEAD => Route::Form,
            _ => Route::MethodNotAllowed("GET, HEAD"),
        },
        GENERATE_PATH => match *method {
            Method::POST => Route::Generate,
            Method::GET | Method::HEAD => Route::RedirectToForm,
            _ => Route::MethodNotAllowed("POST"),
        },
        _ => Route::NotFound,
    }
}
