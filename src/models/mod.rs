pub mod contact;
pub mod facet;
pub mod material;
pub mod milestone;
pub mod site_settings;
pub mod user;
pub mod video;
