pub mod client;
pub mod image;
pub mod titles;
pub mod types;

pub use client::GeminiHttpClient;
pub use image::GeminiImageClient;
pub use titles::GeminiTitleClient;
