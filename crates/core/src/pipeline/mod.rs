pub mod conversion_reporter;
pub mod convert_video_use_case;
