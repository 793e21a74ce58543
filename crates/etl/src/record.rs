//! Record: the flexible key/value structure produced from one log line,
//! plus the classification [`Kind`] it is persisted under.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Well-known record keys written by the extractor.
pub mod keys {
    pub const PRODUCT: &str = "event_product";
    pub const ACTION: &str = "event_action";

    pub const HOST: &str = "event_host";
    pub const HTTP_METHOD: &str = "event_httpmethod";
    pub const HTTP_VERSION: &str = "event_httpversion";
    pub const HTTP_STATUS: &str = "event_httpstatus";
    pub const LENGTH: &str = "event_length";
    pub const REFERER: &str = "event_referer";
    pub const USER_AGENT: &str = "event_useragent";
    pub const OTHERS: &str = "event_others";

    pub const URL: &str = "event_url";
    pub const URL_PATH: &str = "event_urlpath";
    pub const URL_PARAMS: &str = "event_urlparams";

    pub const PARAM_PAGE: &str = "param_page";
    pub const PARAM_LEVEL: &str = "param_level";
    pub const PARAM_TYPE: &str = "param_type";
    pub const PARAM_SORT: &str = "param_sort";
    pub const PARAM_POSITION: &str = "param_position";
    pub const PARAM_VALUE: &str = "param_value";
    pub const PARAM_URL: &str = "param_url";
    pub const PARAM_CAMPAIGN: &str = "param_tn";
    pub const PARAM_CHANNEL: &str = "param_channel";
    pub const PARAM_APPID: &str = "param_appid";

    pub const COOKIE: &str = "event_cookie";
    pub const VISITOR_ID: &str = "event_visitorid";
    pub const DEVICE_ID: &str = "event_deviceid";
    pub const USER_ID: &str = "event_userid";

    pub const VISITOR_TIME: &str = "visitor_time";
    pub const VISITOR_DATE: &str = "visitor_date";
    pub const VISITOR_HOUR: &str = "visitor_hour";
    pub const VISITOR_MINUTE: &str = "visitor_minute";
    pub const DEVICE_TIME: &str = "device_time";
    pub const DEVICE_DATE: &str = "device_date";
    pub const DEVICE_HOUR: &str = "device_hour";
    pub const DEVICE_MINUTE: &str = "device_minute";

    pub const TIME: &str = "event_time";
    pub const DAY: &str = "event_day";
    pub const HOUR: &str = "event_hour";

    pub const IS_SPIDER: &str = "event_isspider";
    pub const SPIDER_DETAIL: &str = "event_spiderdetail";

    pub const IP: &str = "event_ip";
    pub const IP_LONG: &str = "event_ipinlong";
}

/// Classification bucket a record is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Access,
    Click,
    Open,
    Others,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Access, Kind::Click, Kind::Open, Kind::Others];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Access => "access",
            Kind::Click => "click",
            Kind::Open => "open",
            Kind::Others => "others",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Kind::Access),
            "click" => Ok(Kind::Click),
            "open" => Ok(Kind::Open),
            "others" => Ok(Kind::Others),
            other => Err(format!("unknown kind: {}", other)),
        }
    }
}

/// Enriched key/value record. Values are text; numeric and flag
/// semantics ("0"/"1") are a convention of the producing step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Field value, or `""` when absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // ── Typed accessors ─────────────────────────────────────────

    /// Packed IPv4 address. `None` when the field is absent, unparseable,
    /// or zero (the value written when address resolution failed).
    pub fn ip_long(&self) -> Option<u32> {
        self.get(keys::IP_LONG)
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|ip| *ip != 0)
    }

    /// Resolved textual client address.
    pub fn ip(&self) -> Option<&str> {
        self.get(keys::IP).filter(|s| !s.is_empty())
    }

    pub fn host(&self) -> &str {
        self.get_or_empty(keys::HOST)
    }

    pub fn url_path(&self) -> &str {
        self.get_or_empty(keys::URL_PATH)
    }

    /// The `type` query parameter that drives classification.
    pub fn event_type(&self) -> &str {
        self.get_or_empty(keys::PARAM_TYPE)
    }

    pub fn is_spider(&self) -> bool {
        self.get(keys::IS_SPIDER) == Some("1")
    }

    pub fn user_id(&self) -> Option<u64> {
        self.get(keys::USER_ID).and_then(|s| s.parse().ok())
    }
}
