//! Stream URL resolution
//!
//! Turns a logical stream URL such as `webrtc://host:port/app/stream?k=v`
//! into a [`StreamAddress`] and the [`SignalingEndpoint`] that offers are
//! posted to. Supported schemas are `rtmp`, `rtc`/`webrtc`, `http` and
//! `https`; the query may carry `schema`, `port`, `vhost` (alias `domain`),
//! `api` and `play` overrides, everything else is passed through verbatim.

use super::signaling::generate_transaction_id;
use super::SignalingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Vhost used by the server when no virtual hosting applies.
pub const DEFAULT_VHOST: &str = "__defaultVhost__";

/// Marker standing in for `?vhost=` inside an RTMP app path.
const VHOST_MARKER: &str = "...vhost...";

/// Diagnostic endpoint echoed to callers after a successful negotiation.
const SIMULATOR_PATH: &str = "/rtc/v1/nack/";

/// Default port of the SRS HTTP API, which also serves RTC signaling.
const DEFAULT_API_PORT: u16 = 1985;

/// Query keys consumed as structural fields rather than passed through.
const STRUCTURAL_KEYS: &[&str] = &["schema", "server", "port", "vhost", "domain", "app", "stream", "api", "play"];

/// Stream URL schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Rtmp,
    Rtc,
    WebRtc,
    Http,
    Https,
}

impl Schema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::Rtmp => "rtmp",
            Schema::Rtc => "rtc",
            Schema::WebRtc => "webrtc",
            Schema::Http => "http",
            Schema::Https => "https",
        }
    }

    /// `rtc` and `webrtc` name the same signaling family.
    pub fn is_rtc(&self) -> bool {
        matches!(self, Schema::Rtc | Schema::WebRtc)
    }
}

impl FromStr for Schema {
    type Err = SignalingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rtmp" => Ok(Schema::Rtmp),
            "rtc" => Ok(Schema::Rtc),
            "webrtc" => Ok(Schema::WebRtc),
            "http" => Ok(Schema::Http),
            "https" => Ok(Schema::Https),
            other => Err(SignalingError::InvalidUrl(format!("unrecognized schema '{}'", other))),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema of the signaling API itself (the page schema in a browser)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageSchema {
    #[default]
    Http,
    Https,
}

impl PageSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSchema::Http => "http",
            PageSchema::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            PageSchema::Http => 80,
            PageSchema::Https => 443,
        }
    }
}

impl FromStr for PageSchema {
    type Err = SignalingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(PageSchema::Http),
            "https" => Ok(PageSchema::Https),
            other => Err(SignalingError::InvalidUrl(format!("unsupported API schema '{}'", other))),
        }
    }
}

impl fmt::Display for PageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiation role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Publish,
    Play,
}

impl Role {
    /// API path used when the URL carries no `api`/`play` override
    pub fn default_api_path(&self) -> &'static str {
        match self {
            Role::Publish => "/rtc/v1/publish/",
            Role::Play => "/rtc/v1/play/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publish => "publish",
            Role::Play => "play",
        }
    }
}

impl FromStr for Role {
    type Err = SignalingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "publish" => Ok(Role::Publish),
            "play" => Ok(Role::Play),
            other => Err(SignalingError::InvalidUrl(format!(
                "unknown role '{}', expected publish or play",
                other
            ))),
        }
    }
}

/// Resolver settings that a browser would take from the hosting page
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// API schema used when the URL does not override it
    pub page_schema: PageSchema,
}

/// Resolved identity of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAddress {
    /// The logical URL as given by the caller
    pub url: String,
    pub schema: Schema,
    pub server: String,
    pub port: u16,
    pub vhost: String,
    pub app: String,
    pub stream: String,
    /// `schema` query override for the API
    pub schema_override: Option<PageSchema>,
    /// Every query pair in the order given
    pub user_query: Vec<(String, String)>,
}

impl StreamAddress {
    /// Parse a logical stream URL
    pub fn parse(url: &str, options: &ResolveOptions) -> Result<Self, SignalingError> {
        let (scheme_token, rest) = url
            .split_once("://")
            .ok_or_else(|| SignalingError::InvalidUrl(format!("missing schema in '{}'", url)))?;
        let schema: Schema = scheme_token.parse()?;

        // Every schema parses like http once the scheme token is swapped.
        let parsed = Url::parse(&format!("http://{}", rest))
            .map_err(|e| SignalingError::InvalidUrl(format!("'{}': {}", url, e)))?;

        let server = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SignalingError::InvalidUrl(format!("missing server in '{}'", url)))?
            .to_string();

        // The parser drops a port equal to http's default, recover it from the authority.
        let authority_port = parsed.port().or_else(|| authority_has_port(rest).then_some(80));

        let path = parsed.path();
        let last_slash = path.rfind('/').unwrap_or(0);
        let mut app = if last_slash > 0 { path[1..last_slash].to_string() } else { String::new() };
        let stream = path[last_slash + 1..].to_string();

        let mut vhost = None;
        if let Some((bare_app, params)) = app.split_once(VHOST_MARKER) {
            let value = params.split('&').next().unwrap_or_default();
            if !value.is_empty() {
                vhost = Some(value.to_string());
            }
            app = bare_app.to_string();
        }

        if app.is_empty() {
            return Err(SignalingError::InvalidUrl(format!("missing app in '{}'", url)));
        }
        if stream.is_empty() {
            return Err(SignalingError::InvalidUrl(format!("missing stream in '{}'", url)));
        }

        let user_query = parse_query(parsed.query().unwrap_or_default());

        let mut schema_override = None;
        let mut query_port = None;
        for (key, value) in &user_query {
            match key.as_str() {
                "schema" => schema_override = Some(value.parse::<PageSchema>()?),
                "port" => {
                    let port = value
                        .parse::<u16>()
                        .map_err(|_| SignalingError::InvalidUrl(format!("invalid port '{}'", value)))?;
                    query_port = Some(port);
                }
                "vhost" if !value.is_empty() => vhost = Some(value.clone()),
                _ => {}
            }
        }
        // `domain` wins over `vhost` regardless of order.
        if let Some((_, domain)) = user_query.iter().find(|(key, value)| key == "domain" && !value.is_empty()) {
            vhost = Some(domain.clone());
        }

        let vhost = match vhost {
            Some(vhost) => vhost,
            None if is_ipv4_literal(&server) => DEFAULT_VHOST.to_string(),
            None => server.clone(),
        };

        let port = query_port
            .or(authority_port)
            .unwrap_or_else(|| default_port(schema, schema_override, options.page_schema));

        Ok(Self {
            url: url.to_string(),
            schema,
            server,
            port,
            vhost,
            app,
            stream,
            schema_override,
            user_query,
        })
    }

    /// Pass-through query parameters, structural keys removed
    pub fn extra_params(&self) -> Vec<(&str, &str)> {
        self.user_query
            .iter()
            .filter(|(key, _)| !STRUCTURAL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    /// Look up a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.user_query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the vhost has to travel in outward URLs
    pub fn vhost_is_explicit(&self) -> bool {
        self.vhost != self.server && self.vhost != DEFAULT_VHOST
    }

    /// Server-side stream identity, `vhost/app/stream`
    pub fn stream_key(&self) -> String {
        format!("{}/{}/{}", self.vhost, self.app, self.stream)
    }

    /// RTMP URL of the stream
    pub fn rtmp_url(&self) -> String {
        let port = if self.schema == Schema::Rtmp { self.port } else { 1935 };
        let base = format!("rtmp://{}:{}/{}/{}", self.server, port, self.app, self.stream);
        append_query(base, &self.outward_query())
    }

    /// WebRTC URL of the stream, as accepted by [`resolve`]
    pub fn webrtc_url(&self) -> String {
        let base = if self.schema.is_rtc() {
            format!("webrtc://{}:{}/{}/{}", self.server, self.port, self.app, self.stream)
        } else {
            format!("webrtc://{}/{}/{}", self.server, self.app, self.stream)
        };
        append_query(base, &self.outward_query())
    }

    /// HTTP delivery URL, e.g. `extension = "flv"` or `"m3u8"`
    pub fn http_url(&self, schema: PageSchema, port: u16, extension: &str) -> String {
        let authority = if port == schema.default_port() {
            self.server.clone()
        } else {
            format!("{}:{}", self.server, port)
        };
        let base = format!("{}://{}/{}/{}.{}", schema, authority, self.app, self.stream, extension);
        append_query(base, &self.outward_query())
    }

    fn outward_query(&self) -> Vec<(&str, &str)> {
        let mut query = Vec::new();
        if self.vhost_is_explicit() {
            query.push(("vhost", self.vhost.as_str()));
        }
        query.extend(self.extra_params());
        query
    }
}

/// Where an offer is posted, plus per-attempt correlation data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingEndpoint {
    pub api_url: String,
    pub api_schema: PageSchema,
    pub port: u16,
    pub transaction_id: String,
    pub simulator_url: String,
}

impl SignalingEndpoint {
    /// Build the endpoint for a role; a fresh transaction id is drawn each call.
    pub fn new(address: &StreamAddress, role: Role, options: &ResolveOptions) -> Self {
        let api_schema = address.schema_override.unwrap_or(options.page_schema);

        let mut path = address
            .query_param("play")
            .or_else(|| address.query_param("api"))
            .filter(|path| !path.is_empty())
            .unwrap_or(role.default_api_path())
            .to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }

        let query: Vec<(&str, &str)> = address
            .user_query
            .iter()
            .filter(|(key, _)| key != "api" && key != "play")
            .filter(|(key, value)| !((key == "vhost" || key == "domain") && *value == address.server))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let base = format!("{}://{}:{}{}", api_schema, address.server, address.port, path);

        Self {
            api_url: append_query(base, &query),
            api_schema,
            port: address.port,
            transaction_id: generate_transaction_id(),
            simulator_url: format!("{}://{}:{}{}", api_schema, address.server, address.port, SIMULATOR_PATH),
        }
    }
}

/// Resolve a logical URL with default options (http page schema)
pub fn resolve(url: &str, role: Role) -> Result<(SignalingEndpoint, StreamAddress), SignalingError> {
    resolve_with(url, role, &ResolveOptions::default())
}

/// Resolve a logical URL into its signaling endpoint and stream address
pub fn resolve_with(
    url: &str,
    role: Role,
    options: &ResolveOptions,
) -> Result<(SignalingEndpoint, StreamAddress), SignalingError> {
    let address = StreamAddress::parse(url, options)?;
    let endpoint = SignalingEndpoint::new(&address, role, options);
    Ok((endpoint, address))
}

fn default_port(schema: Schema, schema_override: Option<PageSchema>, page_schema: PageSchema) -> u16 {
    match schema {
        Schema::Rtmp => 1935,
        Schema::Http => 80,
        Schema::Https => 443,
        Schema::Rtc | Schema::WebRtc => {
            if schema_override == Some(PageSchema::Https) || page_schema == PageSchema::Https {
                443
            } else {
                DEFAULT_API_PORT
            }
        }
    }
}

fn authority_has_port(rest: &str) -> bool {
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    match host_port.rfind(']') {
        Some(end) => host_port[end + 1..].starts_with(':'),
        None => host_port.contains(':'),
    }
}

fn is_ipv4_literal(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn append_query(base: String, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return base;
    }
    let pairs: Vec<String> = query.iter().map(|(key, value)| format!("{}={}", key, value)).collect();
    format!("{}?{}", base, pairs.join("&"))
}
