//! Extractor: turns one raw access-log line into an enriched [`Record`].
//!
//! Token layout after the configured drop positions are removed:
//!
//! ```text
//! 0 host | 1 ip | 2 time | 3 request | 4 status | 5 length | 6 referer |
//! 7..n-3 cookies | n-3 user-agent | n-2 upstream client ip | n-1 others
//! ```

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cookie::CookieJar;
use super::model::ParseError;
use super::request::{hive_map, query_unescape, query_value, raw_query_of, RequestLine};
use super::tokenizer::TokenizerLayout;
use crate::decode::{decode_embedded_timestamp, decode_session_uid, parse_ip};
use crate::record::{keys, Record};

const LOG_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Query parameters copied into dedicated record fields.
const NAMED_PARAMS: &[(&str, &str)] = &[
    ("page", keys::PARAM_PAGE),
    ("level", keys::PARAM_LEVEL),
    ("type", keys::PARAM_TYPE),
    ("sort", keys::PARAM_SORT),
    ("position", keys::PARAM_POSITION),
    ("value", keys::PARAM_VALUE),
    ("url", keys::PARAM_URL),
    ("tn", keys::PARAM_CAMPAIGN),
    ("channel", keys::PARAM_CHANNEL),
    ("appid", keys::PARAM_APPID),
];

/// Names of the cookies carrying identity tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityCookies {
    /// 32-char visitor token with an embedded creation time.
    pub visitor: String,
    /// 32-char device token with an embedded creation time.
    pub device: String,
    /// 192-char session token carrying the numeric user id.
    pub session: String,
}

impl Default for IdentityCookies {
    fn default() -> Self {
        Self {
            visitor: "BAIDUID".to_string(),
            device: "FLASHID".to_string(),
            session: "BDUSS".to_string(),
        }
    }
}

/// Line tokens mapped onto their roles.
#[derive(Debug)]
struct LineFields<'a> {
    host: &'a str,
    ip: &'a str,
    time: &'a str,
    request: &'a str,
    status: &'a str,
    length: &'a str,
    referer: &'a str,
    cookies: &'a [&'a str],
    user_agent: &'a str,
    client_ip: &'a str,
    others: &'a str,
}

impl<'a> LineFields<'a> {
    fn from_tokens(tokens: &'a [&'a str]) -> Self {
        let n = tokens.len();
        Self {
            host: tokens[0],
            ip: tokens[1],
            time: tokens[2],
            request: tokens[3],
            status: tokens[4],
            length: tokens[5],
            referer: tokens[6],
            cookies: &tokens[7..n - 3],
            user_agent: tokens[n - 3],
            client_ip: tokens[n - 2],
            others: tokens[n - 1],
        }
    }
}

pub struct Extractor {
    layout: TokenizerLayout,
    spiders: Vec<String>,
    cookies: IdentityCookies,
    product: String,
}

impl Extractor {
    /// Drop positions are normalized and `layout.min_fields` is raised to
    /// 11 if lower; the field mapping needs at least one cookie token.
    pub fn new(
        layout: TokenizerLayout,
        spiders: Vec<String>,
        cookies: IdentityCookies,
        product: impl Into<String>,
    ) -> Self {
        let layout = TokenizerLayout::new(layout.drop_positions, layout.min_fields.max(11));
        Self { layout, spiders, cookies, product: product.into() }
    }

    /// Tokenize and enrich one line. Only a short line is an error; every
    /// other defect degrades the record and is logged.
    pub fn extract(&self, line: &str) -> Result<Record, ParseError> {
        let tokens = self.layout.tokenize(line);
        if tokens.len() < self.layout.min_fields {
            debug!(line, tokens = tokens.len(), "discarding short line");
            return Err(ParseError::TooFewFields {
                found: tokens.len(),
                required: self.layout.min_fields,
            });
        }
        let fields = LineFields::from_tokens(&tokens);
        let request = RequestLine::parse(fields.request);

        let mut record = Record::new();
        record.insert(keys::PRODUCT, self.product.as_str());
        record.insert(keys::ACTION, format!("{}_open", self.product));

        copy_plain_fields(&fields, &request, &mut record);
        enrich_url(fields.host, &request, fields.referer, &mut record);
        self.enrich_identity(&CookieJar::parse(fields.cookies), &mut record);
        if let Err(e) = enrich_time(fields.time, &mut record) {
            warn!(error = %e, "leaving time fields blank");
        }
        self.enrich_spider(fields.user_agent, &mut record);
        enrich_ip(fields.ip, fields.client_ip, &mut record);

        Ok(record)
    }

    fn enrich_identity(&self, jar: &CookieJar, record: &mut Record) {
        record.insert(keys::COOKIE, jar.to_json());

        let visitor = jar.prefix32(&self.cookies.visitor);
        let device = jar.prefix32(&self.cookies.device);
        record.insert(keys::VISITOR_ID, visitor);
        record.insert(keys::DEVICE_ID, device);

        let session = jar
            .get(&self.cookies.session)
            .and_then(|raw| query_unescape(raw).ok())
            .unwrap_or_default();
        record.insert(keys::USER_ID, decode_session_uid(&session).to_string());

        insert_creation_time(
            decode_embedded_timestamp(visitor),
            [keys::VISITOR_TIME, keys::VISITOR_DATE, keys::VISITOR_HOUR, keys::VISITOR_MINUTE],
            record,
        );
        insert_creation_time(
            decode_embedded_timestamp(device),
            [keys::DEVICE_TIME, keys::DEVICE_DATE, keys::DEVICE_HOUR, keys::DEVICE_MINUTE],
            record,
        );
    }

    /// First configured signature contained in the user agent wins.
    fn enrich_spider(&self, user_agent: &str, record: &mut Record) {
        match self.spiders.iter().find(|s| user_agent.contains(s.as_str())) {
            Some(sig) => {
                record.insert(keys::IS_SPIDER, "1");
                record.insert(keys::SPIDER_DETAIL, sig.as_str());
            }
            None => {
                record.insert(keys::IS_SPIDER, "0");
                record.insert(keys::SPIDER_DETAIL, "");
            }
        }
    }
}

fn copy_plain_fields(fields: &LineFields<'_>, request: &RequestLine, record: &mut Record) {
    record.insert(keys::HOST, fields.host);
    record.insert(keys::HTTP_METHOD, request.method.as_str());
    record.insert(keys::HTTP_VERSION, request.protocol.as_str());
    record.insert(keys::HTTP_STATUS, fields.status);
    record.insert(keys::LENGTH, fields.length);
    record.insert(keys::REFERER, fields.referer);
    record.insert(keys::USER_AGENT, fields.user_agent);
    record.insert(keys::OTHERS, fields.others);
}

fn enrich_url(host: &str, request: &RequestLine, referer: &str, record: &mut Record) {
    record.insert(keys::URL, format!("http://{}{}", host, request.target));
    record.insert(keys::URL_PATH, request.path.as_str());
    record.insert(keys::URL_PARAMS, hive_map(&request.params));

    let query = request.raw_query();
    for (name, key) in NAMED_PARAMS {
        record.insert(*key, query_value(query, name));
    }

    // Campaign tag falls back to the referer's own query string.
    let campaign = record.get_or_empty(keys::PARAM_CAMPAIGN);
    if (campaign.is_empty() || campaign == "/") && !referer.is_empty() {
        if let Err(reason) = check_referer(referer) {
            warn!(referer, reason, "referer is not a url, keeping campaign tag");
            return;
        }
        let tn = query_value(raw_query_of(referer), "tn");
        let tn = if tn.is_empty() || tn == "%2F" { "/".to_string() } else { tn };
        record.insert(keys::PARAM_CAMPAIGN, tn);
    }
}

/// Reject referers no URL parser would accept: control characters, an
/// empty scheme, or a malformed `%` escape outside the query string.
fn check_referer(referer: &str) -> Result<(), &'static str> {
    if referer.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return Err("control character");
    }
    if referer.starts_with(':') {
        return Err("missing scheme");
    }
    let path = referer.split_once('?').map_or(referer, |(p, _)| p);
    let fragment = referer.split_once('#').map_or("", |(_, f)| f);
    for part in [path, fragment] {
        let bytes = part.as_bytes();
        let bad_escape = bytes.iter().enumerate().any(|(i, &b)| {
            b == b'%'
                && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                    && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
        });
        if bad_escape {
            return Err("invalid escape");
        }
    }
    Ok(())
}

fn enrich_time(raw: &str, record: &mut Record) -> Result<(), ParseError> {
    let tm = DateTime::parse_from_str(raw, LOG_TIME_FORMAT)
        .map_err(|e| ParseError::InvalidTime(format!("{raw:?}: {e}")))?;
    record.insert(keys::TIME, tm.format("%Y-%m-%d %H:%M:%S").to_string());
    record.insert(keys::DAY, tm.format("%Y%m%d").to_string());
    record.insert(keys::HOUR, tm.format("%H").to_string());
    Ok(())
}

/// Render a decoded creation time as `[datetime, date, hour, minute]`.
/// Unknown times (`-1`, `0`) leave all four blank.
fn insert_creation_time(ts: i64, fields: [&str; 4], record: &mut Record) {
    let tm = if ts > 0 { Local.timestamp_opt(ts, 0).single() } else { None };
    let values = match tm {
        Some(tm) => [
            tm.format("%Y-%m-%d %H:%M:%S").to_string(),
            tm.format("%Y%m%d").to_string(),
            tm.format("%H").to_string(),
            tm.format("%M").to_string(),
        ],
        None => Default::default(),
    };
    for (key, value) in fields.into_iter().zip(values) {
        record.insert(key, value);
    }
}

/// Prefer the upstream client ip unless it is `-`; pack it for blacklist
/// lookups, writing `0` when it does not parse.
fn enrich_ip(conn_ip: &str, client_ip: &str, record: &mut Record) {
    let upstream = client_ip
        .split('"')
        .next()
        .and_then(|s| s.split(' ').next())
        .unwrap_or("");
    let ip = if upstream != "-" { upstream } else { conn_ip };

    let packed = match parse_ip(ip) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "client ip does not pack");
            0
        }
    };
    record.insert(keys::IP, ip);
    record.insert(keys::IP_LONG, packed.to_string());
}
