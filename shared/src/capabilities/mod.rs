//! Capabilities the core asks its shell to perform.
//!
//! Render is Crux's own. HTTP is ours so the request timeout travels with
//! every request.

mod http;

pub use self::http::{
    Http, HttpError, HttpHeaders, HttpMethod, HttpOperation, HttpRequest, HttpResponse,
    HttpResult, ValidatedUrl, JSON_CONTENT_TYPE,
};
pub use crux_core::render::Render;

use crate::event::Event;
#[allow(unused_imports)]
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
