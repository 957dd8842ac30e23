//! Record parsers
//!
//! One module per audited category. Each turns resolver answers into a typed
//! record and owns the fallback chain for its category.

pub mod dkim;
pub mod dmarc;
pub mod dnssec;
pub mod mx;
pub mod spf;

pub use dkim::{DkimInfo, DkimProbe};
pub use dmarc::{AlignmentMode, Disposition, DmarcPolicy, DmarcRecord};
pub use dnssec::DnssecInfo;
pub use mx::{AddressKind, MxRecord, ResolvedRecord};
pub use spf::SpfRecord;

use crate::dns::Rcode;
use mailcheck_common::Error;

/// Error for an answer that came back with a non-success response code
pub(crate) fn rcode_error(rcode: Rcode) -> Error {
    Error::Dns(format!("non-success response code {}", rcode))
}
