pub mod picture;
pub mod thumbnail;
pub mod upload;

pub use picture::PictureService;
pub use thumbnail::ThumbnailService;
pub use upload::{discard_staged, IncomingFile, UploadService};
