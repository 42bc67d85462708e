use std::future::{ready, Ready};

use actix_web::http::header::{AsHeaderName, HeaderMap, USER_AGENT};
use actix_web::{dev, FromRequest, HttpRequest};

use crate::domain::{clean_attribute, SubscriberAttributes};
use crate::error::ApiError;

const CLIENT_IP_HEADER: &str = "cf-connecting-ip";
const COUNTRY_HEADER: &str = "cf-ipcountry";
const REGION_HEADER: &str = "cf-region";
const CITY_HEADER: &str = "cf-ipcity";

/// What the edge tells us about the caller
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl ClientContext {
    /// Subscriber attributes combining the request's own fields with edge metadata
    pub fn attributes(
        &self,
        source: Option<&str>,
        referrer: Option<&str>,
        landing_path: Option<&str>,
    ) -> SubscriberAttributes {
        SubscriberAttributes {
            source: clean_attribute(source),
            referrer: clean_attribute(referrer),
            landing_path: clean_attribute(landing_path),
            country: self.country.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

fn header(headers: &HeaderMap, name: impl AsHeaderName) -> Option<String> {
    clean_attribute(headers.get(name).and_then(|v| v.to_str().ok()))
}

impl FromRequest for ClientContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let headers = req.headers();
        let ip = header(headers, CLIENT_IP_HEADER).or_else(|| {
            req.connection_info()
                .realip_remote_addr()
                .map(|addr| addr.to_string())
        });

        ready(Ok(Self {
            ip,
            user_agent: header(headers, USER_AGENT),
            country: header(headers, COUNTRY_HEADER),
            region: header(headers, REGION_HEADER),
            city: header(headers, CITY_HEADER),
        }))
    }
}
