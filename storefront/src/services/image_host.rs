// storefront/src/services/image_host.rs

//! Remote image store: upload returns a URL plus the id needed to delete it.

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::StoredImage;

/// A file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub file_name: Option<String>,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

impl UploadedFile {
  fn extension(&self) -> &str {
    self
      .file_name
      .as_deref()
      .and_then(|name| Path::new(name).extension())
      .and_then(|ext| ext.to_str())
      .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
      .unwrap_or("bin")
  }
}

#[async_trait]
pub trait ImageHost: Send + Sync {
  async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<StoredImage>;
  async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Deletes each image, logging failures. Returns how many were released.
pub async fn release_all(host: &dyn ImageHost, images: &[StoredImage]) -> usize {
  let mut released = 0;
  for image in images {
    match host.delete(&image.public_id).await {
      Ok(()) => released += 1,
      Err(e) => warn!(public_id = %image.public_id, error = %e, "Failed to release remote image."),
    }
  }
  released
}

fn new_public_id(folder: &str, file: &UploadedFile) -> String {
  format!("{}/{}.{}", folder.trim_matches('/'), Uuid::new_v4().simple(), file.extension())
}

/// Deletions remembered by [`MockImageHost::deleted_ids`]; older entries are dropped.
const DELETED_LOG_CAP: usize = 1024;

/// In-memory image host. Tracks which ids are live and can be told to fail.
pub struct MockImageHost {
  base_url: String,
  live: Mutex<BTreeSet<String>>,
  deleted: Mutex<VecDeque<String>>,
  uploads_before_failure: Mutex<Option<usize>>,
  delete_failures: AtomicUsize,
}

impl MockImageHost {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      live: Mutex::new(BTreeSet::new()),
      deleted: Mutex::new(VecDeque::new()),
      uploads_before_failure: Mutex::new(None),
      delete_failures: AtomicUsize::new(0),
    }
  }

  /// Ids uploaded and not yet deleted.
  pub fn live_ids(&self) -> Vec<String> {
    self.live.lock().iter().cloned().collect()
  }

  /// Ids passed to recent successful `delete` calls, in call order.
  pub fn deleted_ids(&self) -> Vec<String> {
    self.deleted.lock().iter().cloned().collect()
  }

  /// Lets `n` more uploads succeed, then fails every upload after that.
  pub fn fail_uploads_after(&self, n: usize) {
    *self.uploads_before_failure.lock() = Some(n);
  }

  /// Makes the next `n` delete calls fail.
  pub fn fail_next_deletes(&self, n: usize) {
    self.delete_failures.store(n, Ordering::SeqCst);
  }
}

#[async_trait]
impl ImageHost for MockImageHost {
  async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<StoredImage> {
    {
      let mut budget = self.uploads_before_failure.lock();
      if let Some(remaining) = budget.as_mut() {
        if *remaining == 0 {
          return Err(AppError::ImageHost("mock image host rejected the upload".to_string()));
        }
        *remaining -= 1;
      }
    }
    let public_id = new_public_id(folder, file);
    self.live.lock().insert(public_id.clone());
    debug!(%public_id, bytes = file.bytes.len(), "Mock upload stored.");
    Ok(StoredImage {
      url: format!("{}/{}", self.base_url, public_id),
      public_id,
    })
  }

  async fn delete(&self, public_id: &str) -> Result<()> {
    let should_fail = self
      .delete_failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if should_fail {
      return Err(AppError::ImageHost(format!("mock image host could not delete {}", public_id)));
    }
    self.live.lock().remove(public_id);
    let mut deleted = self.deleted.lock();
    if deleted.len() == DELETED_LOG_CAP {
      deleted.pop_front();
    }
    deleted.push_back(public_id.to_string());
    Ok(())
  }
}

/// Stores images under a local directory and serves them from `base_url`.
pub struct LocalDiskImageHost {
  root: PathBuf,
  base_url: String,
}

impl LocalDiskImageHost {
  pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }

  fn path_for(&self, public_id: &str) -> Result<PathBuf> {
    if public_id.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
      return Err(AppError::ImageHost(format!("invalid image id '{}'", public_id)));
    }
    Ok(self.root.join(public_id))
  }
}

async fn write_image(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("cannot create {}", parent.display()))?;
  }
  tokio::fs::write(path, bytes)
    .await
    .with_context(|| format!("cannot write {}", path.display()))
}

#[async_trait]
impl ImageHost for LocalDiskImageHost {
  #[instrument(name = "LocalDiskImageHost::upload", skip(self, file), fields(bytes = file.bytes.len()))]
  async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<StoredImage> {
    let public_id = new_public_id(folder, file);
    let path = self.path_for(&public_id)?;
    write_image(&path, &file.bytes).await?;
    info!(%public_id, "Image stored on disk.");
    Ok(StoredImage {
      url: format!("{}/{}", self.base_url, public_id),
      public_id,
    })
  }

  #[instrument(name = "LocalDiskImageHost::delete", skip(self))]
  async fn delete(&self, public_id: &str) -> Result<()> {
    let path = self.path_for(public_id)?;
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!("Image already absent.");
        Ok(())
      }
      Err(e) => Err(anyhow::Error::new(e).context(format!("cannot delete {}", path.display())).into()),
    }
  }
}
