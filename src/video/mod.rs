//! Frame sources.

pub mod webcam;

use std::fmt::Display;

use anyhow::bail;

use crate::image::Image;

/// A source of camera frames.
pub trait CaptureSource {
    /// Requests the next frame.
    ///
    /// Returns `Ok(None)` if no frame is available right now. Callers are expected to simply try
    /// again. Errors indicate that the source is unusable.
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>>;
}

impl<C: CaptureSource + ?Sized> CaptureSource for Box<C> {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        (**self).next_frame()
    }
}

/// Opens the first source in `candidates` that `open` succeeds on.
///
/// Candidates are tried in order. Failures are logged and the next candidate is tried. If none of
/// them can be opened, an error is returned.
pub fn open_first<I, T, S, F>(candidates: I, mut open: F) -> anyhow::Result<S>
where
    I: IntoIterator<Item = T>,
    T: Display,
    F: FnMut(&T) -> anyhow::Result<S>,
{
    for candidate in candidates {
        log::info!("trying camera {candidate}");
        match open(&candidate) {
            Ok(source) => return Ok(source),
            Err(e) => log::warn!("failed opening {candidate}: {e:#}"),
        }
    }

    bail!("no V4L2 camera available")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_working_candidate_wins() {
        let mut tried = Vec::new();
        let opened = open_first(["/dev/video0", "/dev/video1", "/dev/video2"], |&path| {
            tried.push(path);
            if path == "/dev/video0" {
                bail!("no such device")
            }
            Ok(path.to_string())
        })
        .unwrap();

        assert_eq!(opened, "/dev/video1");
        assert_eq!(tried, ["/dev/video0", "/dev/video1"]);
    }

    #[test]
    fn primary_preferred() {
        let opened = open_first(["a", "b"], |&name| Ok(name)).unwrap();
        assert_eq!(opened, "a");
    }

    #[test]
    fn all_candidates_fail() {
        let mut attempts = 0;
        let err = open_first(["/dev/video0", "/dev/video1"], |_| -> anyhow::Result<()> {
            attempts += 1;
            bail!("busy")
        })
        .unwrap_err();

        assert_eq!(attempts, 2);
        assert_eq!(err.to_string(), "no V4L2 camera available");
    }

    #[test]
    fn no_candidates() {
        assert!(open_first(Vec::<String>::new(), |_| Ok(())).is_err());
    }
}
