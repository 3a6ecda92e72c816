use std::path::PathBuf;
use std::process;

use clap::Parser;

use webm_convert_core::pipeline::conversion_reporter::StdoutReporter;
use webm_convert_core::pipeline::convert_video_use_case::ConvertVideoUseCase;
use webm_convert_core::shared::media_paths::MediaPaths;
use webm_convert_core::shared::transcode_settings::TranscodeSettings;
use webm_convert_core::video::infrastructure::ffmpeg_transcoder::FfmpegTranscoder;

/// Convert a local video to WebM (VP8 + Vorbis).
#[derive(Parser, Debug)]
#[command(name = "webm-convert")]
struct Cli {
    /// Source video [default: public/video/anime.mp4].
    #[arg(long)]
    input: Option<PathBuf>,

    /// Destination file [default: public/video/anime.webm].
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also exit with status 1 when the conversion itself fails.
    #[arg(long)]
    strict: bool,
}

impl Cli {
    fn media_paths(&self) -> MediaPaths {
        let defaults = MediaPaths::default();
        MediaPaths::new(
            self.input.clone().unwrap_or(defaults.input),
            self.output.clone().unwrap_or(defaults.output),
        )
    }
}

fn main() {
    env_logger::init();

    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let paths = cli.media_paths();
    validate(&paths)?;
    log::debug!(
        "Converting {} -> {} (strict: {})",
        paths.input.display(),
        paths.output.display(),
        cli.strict
    );

    let mut use_case = ConvertVideoUseCase::new(
        Box::new(FfmpegTranscoder::new()),
        Box::new(StdoutReporter::default()),
        TranscodeSettings::webm(),
    );
    let outcome = use_case.execute(&paths);

    Ok(outcome.exit_code(cli.strict))
}

fn validate(paths: &MediaPaths) -> Result<(), Box<dyn std::error::Error>> {
    if paths.input == paths.output {
        return Err(format!(
            "Input and output paths must differ: {}",
            paths.input.display()
        )
        .into());
    }
    Ok(())
}
