use std::collections::HashSet;

use crate::decode::parse_ip;
use crate::error::EtlError;
use crate::record::Record;

/// Packed IPv4 addresses whose traffic is discarded. Empty accepts all.
#[derive(Debug, Clone, Default)]
pub struct IpBlacklist {
    ips: HashSet<u32>,
}

impl IpBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: u32) {
        self.ips.insert(ip);
    }

    pub fn insert_str(&mut self, ip: &str) -> Result<(), EtlError> {
        self.insert(parse_ip(ip)?);
        Ok(())
    }

    pub fn contains(&self, ip: u32) -> bool {
        self.ips.contains(&ip)
    }

    pub fn len(&self) -> usize {
        self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }

    /// Check the record's packed ip first, then its textual ip. A record
    /// whose address cannot be resolved either way is not blocked.
    pub fn blocks(&self, record: &Record) -> bool {
        if self.ips.is_empty() {
            return false;
        }
        let ip = record
            .ip_long()
            .or_else(|| record.ip().and_then(|s| parse_ip(s).ok()));
        match ip {
            Some(ip) => self.contains(ip),
            None => false,
        }
    }
}

impl FromIterator<u32> for IpBlacklist {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self { ips: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::keys;

    fn record(ip: Option<&str>, ip_long: Option<&str>) -> Record {
        let mut r = Record::new();
        if let Some(ip) = ip {
            r.insert(keys::IP, ip);
        }
        if let Some(v) = ip_long {
            r.insert(keys::IP_LONG, v);
        }
        r
    }

    #[test]
    fn test_empty_blacklist_accepts_everything() {
        let list = IpBlacklist::new();
        assert!(!list.blocks(&record(Some("1.2.3.4"), Some("16909060"))));
        assert!(!list.blocks(&record(Some("0.0.0.0"), None)));
    }

    #[test]
    fn test_packed_ip_checked_first() {
        let list: IpBlacklist = [0x0102_0304u32].into_iter().collect();
        assert!(list.blocks(&record(Some("9.9.9.9"), Some("16909060"))));
    }

    #[test]
    fn test_falls_back_to_textual_ip() {
        let mut list = IpBlacklist::new();
        list.insert_str("1.2.3.4").unwrap();
        assert!(list.blocks(&record(Some("1.2.3.4"), None)));
        assert!(list.blocks(&record(Some("1.2.3.4"), Some("garbage"))));
        assert!(!list.blocks(&record(Some("1.2.3.5"), None)));
    }

    #[test]
    fn test_unresolvable_ip_is_not_blocked_as_zero() {
        let list: IpBlacklist = [0u32].into_iter().collect();
        assert!(!list.blocks(&record(Some("unknown"), Some("0"))));
        assert!(!list.blocks(&record(None, None)));
        // an explicit 0.0.0.0 is still a real lookup
        assert!(list.blocks(&record(Some("0.0.0.0"), Some("0"))));
    }
}
