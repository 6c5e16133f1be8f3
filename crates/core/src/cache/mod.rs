//! Persistent asset cache indices.
//!
//! Two instances exist at runtime: one for fetched PDFs and one for
//! translations. Each is an in-memory map mirrored to a JSON snapshot that is
//! replaced atomically on every mutation.

mod atomic;
mod index;
mod types;

pub use atomic::write_json_atomic;
pub use index::{AssetIndex, SNAPSHOT_VERSION};
pub use types::{Asset, AssetClass, AssetStatus, PdfAsset, TranslateAsset, UnknownAssetClass};

/// Index of fetched PDFs.
pub type PdfIndex = AssetIndex<PdfAsset>;

/// Index of translated outputs.
pub type TranslateIndex = AssetIndex<TranslateAsset>;
