//! Upstream disclosure feeds
//!
//! `RecordSource` is the seam; `BseSource` is the production feed and
//! `ScriptedSource` serves canned pages. `fetch_all` owns the pagination
//! rules shared by every source.

mod bse;
mod paginate;
mod scripted;
mod traits;

pub use bse::{BseSource, BSE_ATTACHMENT_BASE};
pub use paginate::{fetch_all, FetchOutcome};
pub use scripted::ScriptedSource;
pub use traits::{RecordSource, SourceError};
