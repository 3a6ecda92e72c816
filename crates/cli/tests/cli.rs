use std::path::Path;
use std::process::{Command, Output};

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_webm-convert"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn media_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join("public").join("video");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a short MPEG-4 clip with a moving gray gradient.
fn create_test_video(path: &Path, num_frames: i64, width: u32, height: u32) {
    use ffmpeg_next::format::Pixel;
    use ffmpeg_next::Rational;

    ffmpeg_next::init().unwrap();
    let mut octx = ffmpeg_next::format::output(path).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();
    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(Pixel::YUV420P);
    encoder_ctx.set_time_base(Rational(1, 10));
    encoder_ctx.set_frame_rate(Some(Rational(10, 1)));
    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);

    octx.write_header().unwrap();
    let ost_time_base = octx.stream(0).unwrap().time_base();

    for i in 0..=num_frames {
        if i < num_frames {
            let mut frame = ffmpeg_next::frame::Video::new(Pixel::YUV420P, width, height);
            for plane in 0..frame.planes() {
                let value = if plane == 0 { (i * 20 % 256) as u8 } else { 128 };
                frame.data_mut(plane).fill(value);
            }
            frame.set_pts(Some(i));
            encoder.send_frame(&frame).unwrap();
        } else {
            encoder.send_eof().unwrap();
        }
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(Rational(1, 10), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
    }
    octx.write_trailer().unwrap();
}

#[test]
fn test_missing_input_exits_with_status_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let input = Path::new("public").join("video").join("anime.mp4");
    assert!(stdout.contains(&format!("Loading {}...", input.display())));
    assert!(stdout.contains("Error: Input file not found!"));
    assert!(!stdout.contains("Starting conversion"));
    assert!(!dir.path().join("public/video/anime.webm").exists());
}

#[test]
fn test_zero_byte_input_reports_failure_and_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(media_dir(dir.path()).join("anime.mp4"), b"").unwrap();

    let out = run_in(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Conversion failed: "));
    assert!(!stdout.contains("Success!"));
}

#[test]
fn test_strict_turns_failure_into_status_1() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(media_dir(dir.path()).join("anime.mp4"), b"not a video").unwrap();

    let out = run_in(dir.path(), &["--strict"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Conversion failed: "));
}

#[test]
fn test_custom_input_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["--input", "clip.mov"]);

    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Loading clip.mov..."));
    assert!(stdout.contains("Error: Input file not found!"));
}

#[test]
#[cfg_attr(
    not(feature = "static-ffmpeg"),
    ignore = "needs FFmpeg built with libvpx and libvorbis"
)]
fn test_converts_default_clip() {
    let dir = tempfile::tempdir().unwrap();
    create_test_video(&media_dir(dir.path()).join("anime.mp4"), 10, 160, 120);

    let out = run_in(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    let input = Path::new("public").join("video").join("anime.mp4");
    let output = Path::new("public").join("video").join("anime.webm");
    assert!(lines.contains(&format!("Loading {}...", input.display()).as_str()));
    assert!(lines.contains(&"Starting conversion... This might take a minute."));
    assert!(lines.contains(&format!("Success! Saved to {}", output.display()).as_str()));

    let written = std::fs::metadata(dir.path().join(&output)).unwrap();
    assert!(written.len() > 0);
}

#[test]
fn test_same_input_and_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["--input", "a.mp4", "--output", "a.mp4"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Input and output paths must differ"));
    assert!(out.stdout.is_empty());
}
