//! Record filtering: host whitelist, IP blacklist, and the kind classifier.

pub mod blacklist;
pub mod classify;
pub mod whitelist;

pub use blacklist::IpBlacklist;
pub use classify::{Classifier, ClassifierRules, Verdict};
pub use whitelist::HostWhitelist;
