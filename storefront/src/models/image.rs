// storefront/src/models/image.rs

use serde::{Deserialize, Serialize};

/// An image held by the remote image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
  pub url: String,
  /// Identifier used to delete the image from the store.
  pub public_id: String,
}
