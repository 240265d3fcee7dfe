use actix_web::{dev::Payload, error::ErrorBadRequest, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

pub const OWNER_HEADER: &str = "X-Owner-Id";

/// Owner of the itineraries a request acts on, taken from the `X-Owner-Id`
/// header or, failing that, the `owner_id` query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for OwnerId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let from_header = req
            .headers()
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let owner = from_header.or_else(|| {
            url::form_urlencoded::parse(req.query_string().as_bytes())
                .find(|(key, value)| key == "owner_id" && !value.trim().is_empty())
                .map(|(_, value)| value.trim().to_string())
        });

        match owner {
            Some(owner) => ready(Ok(OwnerId(owner))),
            None => ready(Err(ErrorBadRequest("Missing owner id"))),
        }
    }
}
