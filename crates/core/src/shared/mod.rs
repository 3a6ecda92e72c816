pub mod constants;
pub mod media_info;
pub mod media_paths;
pub mod transcode_settings;
