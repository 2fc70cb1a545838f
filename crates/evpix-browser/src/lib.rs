//! Face-cluster browser.
//!
//! Turns cached cluster lists into a browsing surface:
//! - Rotating sample thumbnails per cluster (`cycling`)
//! - A selection of person clusters (`selection`)
//! - Selection persisted in a query parameter (`filter`)
//! - Handing the selection to the gallery (`gallery`)
//! - Remembering faces that cannot be cropped (`failures`)
//!
//! `BrowserSession` ties these together for one event.

pub mod config;
pub mod cycling;
pub mod error;
pub mod failures;
pub mod filter;
pub mod gallery;
pub mod selection;
pub mod session;
pub mod thumbnails;
pub mod view;

pub use config::BrowserConfig;
pub use cycling::CyclingState;
pub use error::{BrowserError, BrowserResult};
pub use failures::CropFailureSet;
pub use filter::{FilterSynchronizer, MemoryQuery, QueryState, UrlQuery};
pub use gallery::GalleryFilter;
pub use selection::{Selection, ToggleOutcome};
pub use session::{BrowserServices, BrowserSession, LoadReport};
pub use thumbnails::{ThumbnailState, ThumbnailTable};
pub use view::{BrowserView, ClusterCard, EmptyState};
