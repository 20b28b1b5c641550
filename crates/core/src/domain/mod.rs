pub mod meeting;
pub mod metadata;
