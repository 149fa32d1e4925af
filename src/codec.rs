//! URL encoding of render parameters.
//!
//! [`UrlCodec::encode`] turns a [`ParameterSet`] into a render URL: the
//! template name is the last path segment under the route, every field that
//! differs from [`ParameterSet::DEFAULTS`] becomes a query parameter, and
//! data entries are spelled `data[key]=value`. [`UrlCodec::decode`] goes the
//! other way for inbound requests.
//!
//! ```rust
//! use html2raster_api::{InboundRequest, ParameterSet, UrlCodec};
//!
//! # fn main() -> html2raster_api::Result<()> {
//! let codec = UrlCodec::new("https://example.com", "/raster")?;
//!
//! let url = codec.encode(&ParameterSet::new("cards.og").with_width(1200).with_cache(true))?;
//! assert_eq!(url.as_str(), "https://example.com/raster/cards.og?width=1200&cache=1");
//!
//! let request = InboundRequest::from_query(url.query().unwrap_or_default());
//! let params = codec.decode("cards.og", request)?;
//! assert_eq!(params.width(), Some(1200));
//! assert!(params.cache());
//! # Ok(())
//! # }
//! ```
//!
//! # Signing
//!
//! With a [`UrlSigner`] attached, encoded URLs carry a `signature` query
//! parameter computed over the URL exactly as encoded, and
//! [`UrlCodec::verify`] rejects inbound requests whose remaining parameters
//! do not reproduce it. Parameter order is part of the signed payload.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::error::{RasterError, Result};
use crate::params::{DataMap, DataSource, InboundRequest, ParameterSet};

/// Query parameter carrying the URL signature.
pub const SIGNATURE_PARAM: &str = "signature";

/// Signs and verifies render URLs.
pub trait UrlSigner: Send + Sync {
    /// Signature for `payload`.
    fn sign(&self, payload: &str) -> String;

    /// Whether `signature` is valid for `payload`.
    fn verify(&self, payload: &str, signature: &str) -> bool;
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer producing lowercase hex signatures.
#[derive(Clone)]
pub struct HmacUrlSigner {
    mac: HmacSha256,
}

impl HmacUrlSigner {
    /// Signer keyed with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Configuration`] for an empty key.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(RasterError::Configuration(
                "URL signing key must not be empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| RasterError::Configuration(format!("invalid signing key: {}", e)))?;
        Ok(Self { mac })
    }
}

impl UrlSigner for HmacUrlSigner {
    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify(&self, payload: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for HmacUrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacUrlSigner(..)")
    }
}

/// Encodes parameter sets as render URLs and decodes inbound requests.
#[derive(Clone)]
pub struct UrlCodec {
    base: Url,
    route: Vec<String>,
    signer: Option<Arc<dyn UrlSigner>>,
}

impl UrlCodec {
    /// Codec for URLs under `base_url` + `route`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Configuration`] if `base_url` does not parse
    /// as an absolute URL with a path.
    pub fn new(base_url: &str, route: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            RasterError::Configuration(format!("invalid base URL '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(RasterError::Configuration(format!(
                "base URL '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            base,
            route: route
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            signer: None,
        })
    }

    /// Sign encoded URLs and require signatures on inbound requests.
    pub fn with_signer<S: UrlSigner + 'static>(self, signer: S) -> Self {
        self.with_shared_signer(Arc::new(signer))
    }

    /// Like [`with_signer`](Self::with_signer) for an already shared signer.
    pub fn with_shared_signer(mut self, signer: Arc<dyn UrlSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Whether a signer is attached.
    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }

    /// Route prefix as a path, e.g. `/raster`.
    pub fn route(&self) -> String {
        format!("/{}", self.route.join("/"))
    }

    /// `base_url/route/name` without a query.
    pub fn resource_url(&self, name: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RasterError::Configuration("base URL cannot carry a path".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(self.route.iter());
            segments.push(name);
        }
        Ok(url)
    }

    /// Render URL for `params`, signed when a signer is attached.
    ///
    /// Deferred data cannot be carried in a URL and is left out.
    pub fn encode(&self, params: &ParameterSet) -> Result<Url> {
        params.validate()?;
        let mut url = self.resource_url(params.name())?;
        let pairs = query_pairs(params);
        set_pairs(&mut url, pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if let Some(signer) = &self.signer {
            let signature = signer.sign(url.as_str());
            url.query_pairs_mut()
                .append_pair(SIGNATURE_PARAM, &signature);
        }
        Ok(url)
    }

    /// Automatic-mode parameters for `name` from an inbound request.
    pub fn decode(&self, name: &str, request: InboundRequest) -> Result<ParameterSet> {
        Self::apply_request(ParameterSet::automatic(name, request))
    }

    /// Apply the attached request's recognized fields to `params`.
    ///
    /// Unrecognized keys are ignored. The request's `data[...]` entries are
    /// passed to a deferred resolver, or merged over literal data. Without
    /// an attached request (manual mode) `params` is returned unchanged.
    /// A request is applied once; later calls return `params` as is, so a
    /// resolver's output is never overwritten by inbound data.
    pub fn apply_request(mut params: ParameterSet) -> Result<ParameterSet> {
        if params.is_request_applied() {
            return Ok(params);
        }
        let Some(request) = params.request().cloned() else {
            return Ok(params);
        };

        for (key, value) in request.pairs() {
            params.apply_field(key, value)?;
        }

        let inbound = request.data();
        let data: DataMap = match params.data() {
            DataSource::Deferred(resolver) => resolver(&inbound)?,
            DataSource::Literal(base) => {
                let mut merged = base.clone();
                merged.extend(inbound);
                merged
            }
        };
        params.set_data(DataSource::Literal(data));
        params.mark_request_applied();
        Ok(params)
    }

    /// Check the signature of an inbound request for `name`.
    ///
    /// Always succeeds when no signer is attached.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::InvalidSignature`] when the `signature`
    /// parameter is missing or does not match.
    pub fn verify(&self, name: &str, request: &InboundRequest) -> Result<()> {
        let Some(signer) = &self.signer else {
            return Ok(());
        };
        let signature = request
            .get(SIGNATURE_PARAM)
            .ok_or(RasterError::InvalidSignature)?;

        let mut url = self.resource_url(name)?;
        set_pairs(&mut url, request.pairs().filter(|(k, _)| *k != SIGNATURE_PARAM));

        if signer.verify(url.as_str(), signature) {
            Ok(())
        } else {
            Err(RasterError::InvalidSignature)
        }
    }

    /// Split a render URL into template name and request fields.
    pub fn parse_url(&self, url: &Url) -> Result<(String, InboundRequest)> {
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| RasterError::invalid_parameter("name", "URL has no template segment"))?;
        let name = urlencoding::decode(name)
            .map_err(|e| RasterError::invalid_parameter("name", e.to_string()))?
            .into_owned();
        Ok((name, InboundRequest::from_query(url.query().unwrap_or_default())))
    }
}

impl fmt::Debug for UrlCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlCodec")
            .field("base", &self.base.as_str())
            .field("route", &self.route)
            .field("signed", &self.is_signed())
            .finish()
    }
}

/// Non-default fields of `params` in canonical order.
pub fn query_pairs(params: &ParameterSet) -> Vec<(String, String)> {
    let defaults = &ParameterSet::DEFAULTS;
    let mut pairs = Vec::new();

    if let Some(data) = params.data().as_literal() {
        for (key, value) in data {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.push((format!("data[{}]", key), text));
        }
    }

    let dimensions = [
        ("width", params.width(), defaults.width()),
        ("height", params.height(), defaults.height()),
        ("basis", params.basis(), defaults.basis()),
        ("scale", Some(params.scale()), Some(defaults.scale())),
    ];
    for (key, value, default) in dimensions {
        if value != default {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
    }

    if params.image_type() != defaults.image_type() {
        pairs.push(("type".to_string(), params.image_type().to_string()));
    }

    let flags = [
        ("transparent", params.transparent(), defaults.transparent()),
        ("preview", params.preview(), defaults.preview()),
        ("cache", params.cache(), defaults.cache()),
    ];
    for (key, value, default) in flags {
        if value != default {
            pairs.push((key.to_string(), if value { "1" } else { "0" }.to_string()));
        }
    }

    if params.cache_id() != defaults.cache_id() {
        pairs.push(("cacheId".to_string(), params.cache_id().to_string()));
    }

    pairs
}

/// Replace the query of `url`; no pairs leaves no `?`.
fn set_pairs<'a>(url: &mut Url, pairs: impl Iterator<Item = (&'a str, &'a str)>) {
    url.set_query(None);
    let mut pairs = pairs.peekable();
    if pairs.peek().is_some() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
}
