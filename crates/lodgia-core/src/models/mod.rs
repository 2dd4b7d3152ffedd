pub mod auth;
pub mod media;
pub mod upload;

pub use auth::UserRole;
pub use media::{LodgingImage, PendingUpload, ProfileImage, PENDING_STATUS};
pub use upload::{
    ConfirmImageRequest, ConfirmLodgingImageResponse, ConfirmProfileImageResponse,
    DeleteLodgingImageResponse, DeleteProfileImageResponse, ImageUploadUrlResponse,
    LodgingImageResponse, MediaUrlVariants, ProfileImageResponse, RequestImageUploadUrl,
    SetDefaultLodgingImageResponse,
};
