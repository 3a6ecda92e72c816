/// Per-channel float sample buffer.
///
/// Resampled audio arrives in whatever chunk sizes the decoder produces, but
/// most audio encoders only accept frames of exactly `frame_size` samples
/// (the last one may be shorter). The FIFO regroups samples accordingly.
pub(crate) struct SampleFifo {
    planes: Vec<Vec<f32>>,
}

impl SampleFifo {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            planes: vec![Vec::new(); channels.max(1)],
        }
    }

    pub(crate) fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Samples buffered per channel.
    pub(crate) fn len(&self) -> usize {
        self.planes[0].len()
    }

    /// Appends one chunk per channel. All chunks must have equal length.
    pub(crate) fn push(&mut self, chunks: &[&[f32]]) {
        debug_assert_eq!(chunks.len(), self.planes.len());
        debug_assert!(chunks.iter().all(|c| c.len() == chunks[0].len()));
        for (plane, chunk) in self.planes.iter_mut().zip(chunks) {
            plane.extend_from_slice(chunk);
        }
    }

    /// Removes exactly `n` samples per channel, or `None` if fewer are
    /// buffered.
    pub(crate) fn pop(&mut self, n: usize) -> Option<Vec<Vec<f32>>> {
        if n == 0 || self.len() < n {
            return None;
        }
        Some(self.take(n))
    }

    /// Removes everything that is left, or `None` if empty.
    pub(crate) fn drain(&mut self) -> Option<Vec<Vec<f32>>> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        Some(self.take(n))
    }

    fn take(&mut self, n: usize) -> Vec<Vec<f32>> {
        self.planes
            .iter_mut()
            .map(|plane| plane.drain(..n).collect())
            .collect()
    }
}
