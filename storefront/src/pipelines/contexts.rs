// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers receive these wrapped in
//! `storefront_flow::ContextData`.

use crate::authz::Actor;
use crate::models::{
  FormFields, NewProduct, NewReview, Product, ProductPatch, Review, ReviewPatch, ReviewerSummary, Session, StoredImage, User,
};
use crate::services::image_host::UploadedFile;
use crate::state::AppState;
use uuid::Uuid;

/// Contexts that upload client files and must release them if a later step fails.
pub trait ImageUploadCtx: Send + Sync + 'static {
  fn app_state(&self) -> &AppState;
  fn upload_folder(&self) -> String;
  fn has_pending_files(&self) -> bool;
  fn take_pending_files(&mut self) -> Vec<UploadedFile>;
  /// Images uploaded by this run and not yet owned by a persisted record.
  fn uploaded_mut(&mut self) -> &mut Vec<StoredImage>;
}

macro_rules! image_upload_ctx {
  ($ctx:ty, $folder:ident) => {
    impl ImageUploadCtx for $ctx {
      fn app_state(&self) -> &AppState {
        &self.app_state
      }

      fn upload_folder(&self) -> String {
        self.app_state.config.$folder.clone()
      }

      fn has_pending_files(&self) -> bool {
        !self.files.is_empty()
      }

      fn take_pending_files(&mut self) -> Vec<UploadedFile> {
        std::mem::take(&mut self.files)
      }

      fn uploaded_mut(&mut self) -> &mut Vec<StoredImage> {
        &mut self.uploaded
      }
    }
  };
}

// --- Auth ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub name: String,
  pub email: String,
  pub password: String,
  pub requested_role: Option<String>,
  pub created_user: Option<User>,
  pub session: Option<Session>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub session: Option<Session>,
}

// --- Products ---

#[derive(Clone)]
pub struct CreateProductCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub fields: FormFields,
  pub files: Vec<UploadedFile>,
  pub validated: Option<NewProduct>,
  pub uploaded: Vec<StoredImage>,
  pub created: Option<Product>,
}

#[derive(Clone)]
pub struct UpdateProductCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub product_id: Uuid,
  pub fields: FormFields,
  pub files: Vec<UploadedFile>,
  pub existing: Option<Product>,
  pub patch: Option<ProductPatch>,
  pub uploaded: Vec<StoredImage>,
  /// Photos detached from the product by this update, released after persisting.
  pub replaced: Vec<StoredImage>,
  pub updated: Option<Product>,
}

#[derive(Clone)]
pub struct DeleteProductCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub product_id: Uuid,
  pub existing: Option<Product>,
  pub released_images: usize,
}

#[derive(Clone)]
pub struct AddRatingCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub product_id: Uuid,
  pub raw_rating: i64,
  pub comment: Option<String>,
  pub rating: Option<u8>,
  pub product: Option<Product>,
}

// --- Reviews ---

#[derive(Clone)]
pub struct CreateReviewCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub fields: FormFields,
  pub files: Vec<UploadedFile>,
  pub validated: Option<NewReview>,
  pub uploaded: Vec<StoredImage>,
  pub created: Option<Review>,
  pub reviewer: Option<ReviewerSummary>,
}

#[derive(Clone)]
pub struct UpdateReviewCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub review_id: Uuid,
  pub fields: FormFields,
  pub files: Vec<UploadedFile>,
  pub existing: Option<Review>,
  pub patch: Option<ReviewPatch>,
  pub uploaded: Vec<StoredImage>,
  pub replaced: Vec<StoredImage>,
  pub updated: Option<Review>,
}

#[derive(Clone)]
pub struct DeleteReviewCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub review_id: Uuid,
  pub existing: Option<Review>,
  pub released_images: usize,
}

#[derive(Clone)]
pub struct ToggleLikeCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub review_id: Uuid,
  pub review: Option<Review>,
  pub liked: Option<bool>,
}

image_upload_ctx!(CreateProductCtxData, image_folder_products);
image_upload_ctx!(UpdateProductCtxData, image_folder_products);
image_upload_ctx!(CreateReviewCtxData, image_folder_reviews);
image_upload_ctx!(UpdateReviewCtxData, image_folder_reviews);

impl CreateProductCtxData {
  pub fn new(app_state: AppState, actor: Actor, fields: FormFields, files: Vec<UploadedFile>) -> Self {
    Self {
      app_state,
      actor,
      fields,
      files,
      validated: None,
      uploaded: Vec::new(),
      created: None,
    }
  }
}

impl UpdateProductCtxData {
  pub fn new(
    app_state: AppState,
    actor: Actor,
    product_id: Uuid,
    fields: FormFields,
    files: Vec<UploadedFile>,
  ) -> Self {
    Self {
      app_state,
      actor,
      product_id,
      fields,
      files,
      existing: None,
      patch: None,
      uploaded: Vec::new(),
      replaced: Vec::new(),
      updated: None,
    }
  }
}

impl DeleteProductCtxData {
  pub fn new(app_state: AppState, actor: Actor, product_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      product_id,
      existing: None,
      released_images: 0,
    }
  }
}

impl AddRatingCtxData {
  pub fn new(app_state: AppState, actor: Actor, product_id: Uuid, raw_rating: i64, comment: Option<String>) -> Self {
    Self {
      app_state,
      actor,
      product_id,
      raw_rating,
      comment,
      rating: None,
      product: None,
    }
  }
}

impl CreateReviewCtxData {
  pub fn new(app_state: AppState, actor: Actor, fields: FormFields, files: Vec<UploadedFile>) -> Self {
    Self {
      app_state,
      actor,
      fields,
      files,
      validated: None,
      uploaded: Vec::new(),
      created: None,
      reviewer: None,
    }
  }
}

impl UpdateReviewCtxData {
  pub fn new(app_state: AppState, actor: Actor, review_id: Uuid, fields: FormFields, files: Vec<UploadedFile>) -> Self {
    Self {
      app_state,
      actor,
      review_id,
      fields,
      files,
      existing: None,
      patch: None,
      uploaded: Vec::new(),
      replaced: Vec::new(),
      updated: None,
    }
  }
}

impl DeleteReviewCtxData {
  pub fn new(app_state: AppState, actor: Actor, review_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      review_id,
      existing: None,
      released_images: 0,
    }
  }
}

impl ToggleLikeCtxData {
  pub fn new(app_state: AppState, actor: Actor, review_id: Uuid) -> Self {
    Self {
      app_state,
      actor,
      review_id,
      review: None,
      liked: None,
    }
  }
}
