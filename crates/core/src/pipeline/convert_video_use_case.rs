use std::path::PathBuf;

use crate::pipeline::conversion_reporter::ConversionReporter;
use crate::shared::media_paths::MediaPaths;
use crate::shared::transcode_settings::TranscodeSettings;
use crate::video::domain::video_transcoder::VideoTranscoder;

pub const MSG_INPUT_NOT_FOUND: &str = "Error: Input file not found!";
pub const MSG_STARTING: &str = "Starting conversion... This might take a minute.";

#[derive(Clone, Debug, PartialEq)]
pub enum ConversionOutcome {
    Converted { output: PathBuf },
    InputMissing { input: PathBuf },
    Failed { message: String },
}

impl ConversionOutcome {
    /// Process exit status for this outcome.
    ///
    /// A caught transcode failure still exits 0 unless `strict` is set; only
    /// a missing input is always fatal.
    pub fn exit_code(&self, strict: bool) -> i32 {
        match self {
            ConversionOutcome::Converted { .. } => 0,
            ConversionOutcome::InputMissing { .. } => 1,
            ConversionOutcome::Failed { .. } => i32::from(strict),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }
}

/// Load -> transcode -> save -> close for a single file.
pub struct ConvertVideoUseCase {
    transcoder: Box<dyn VideoTranscoder>,
    reporter: Box<dyn ConversionReporter>,
    settings: TranscodeSettings,
}

impl ConvertVideoUseCase {
    pub fn new(
        transcoder: Box<dyn VideoTranscoder>,
        reporter: Box<dyn ConversionReporter>,
        settings: TranscodeSettings,
    ) -> Self {
        Self {
            transcoder,
            reporter,
            settings,
        }
    }

    pub fn execute(&mut self, paths: &MediaPaths) -> ConversionOutcome {
        let loading = format!("Loading {}...", paths.input.display());
        self.reporter.status(&loading);

        if !paths.input_exists() {
            self.reporter.status(MSG_INPUT_NOT_FOUND);
            return ConversionOutcome::InputMissing {
                input: paths.input.clone(),
            };
        }

        match self.convert(paths) {
            Ok(()) => {
                let saved = format!("Success! Saved to {}", paths.output.display());
                self.reporter.status(&saved);
                ConversionOutcome::Converted {
                    output: paths.output.clone(),
                }
            }
            Err(e) => {
                let message = e.to_string();
                log::debug!("Conversion of {} failed: {e:?}", paths.input.display());
                self.reporter.status(&format!("Conversion failed: {message}"));
                ConversionOutcome::Failed { message }
            }
        }
    }

    fn convert(&mut self, paths: &MediaPaths) -> Result<(), Box<dyn std::error::Error>> {
        self.transcoder.open(&paths.input)?;

        self.reporter.status(MSG_STARTING);

        let reporter = &mut self.reporter;
        let mut progress = |current: usize, total: usize| reporter.progress(current, total);
        let result = self
            .transcoder
            .transcode(&paths.output, &self.settings, Some(&mut progress));
        self.reporter.finish_progress();
        result?;

        self.transcoder.close();
        Ok(())
    }
}
