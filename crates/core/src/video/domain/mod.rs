pub mod video_transcoder;
