//! Text recognition collaborator.
//!
//! The pipeline never looks at pixels. It receives the complete, ordered line
//! list for one image from a [`TextRecognizer`]. Recognition models are heavy,
//! so [`LazyRecognizer`] loads one on first use and keeps it for the life of
//! the process, and [`recognize_in_background`] runs the work off the calling
//! thread.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::{Result, SpendscanError};

pub trait TextRecognizer: Send + Sync {
    /// Recognized lines of `image`, top to bottom.
    fn recognize(&self, image: &Path) -> Result<Vec<String>>;
}

/// Reads lines that were recognized ahead of time and saved as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFileRecognizer;

impl TextRecognizer for TextFileRecognizer {
    fn recognize(&self, image: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(image)?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

/// Loads the wrapped recognizer on first use.
///
/// A failed load is not cached; the next call tries again.
pub struct LazyRecognizer<R, F> {
    cell: OnceLock<R>,
    init: Mutex<()>,
    loader: F,
}

impl<R, F> LazyRecognizer<R, F>
where
    R: TextRecognizer,
    F: Fn() -> Result<R> + Send + Sync,
{
    pub fn new(loader: F) -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
            loader,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<&R> {
        if let Some(loaded) = self.cell.get() {
            return Ok(loaded);
        }
        let _guard = self
            .init
            .lock()
            .map_err(|_| SpendscanError::Recognition("loader lock poisoned".into()))?;
        if let Some(loaded) = self.cell.get() {
            return Ok(loaded);
        }
        let loaded = (self.loader)()?;
        info!("text recognizer loaded");
        Ok(self.cell.get_or_init(|| loaded))
    }
}

impl<R, F> TextRecognizer for LazyRecognizer<R, F>
where
    R: TextRecognizer,
    F: Fn() -> Result<R> + Send + Sync,
{
    fn recognize(&self, image: &Path) -> Result<Vec<String>> {
        self.get()?.recognize(image)
    }
}

/// Handle to recognition running on a worker thread.
pub struct RecognitionJob {
    handle: JoinHandle<Result<Vec<String>>>,
}

impl RecognitionJob {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the worker is done and returns every recognized line.
    pub fn wait(self) -> Result<Vec<String>> {
        self.handle
            .join()
            .map_err(|_| SpendscanError::Recognition("recognition worker panicked".into()))?
    }
}

pub fn recognize_in_background<R>(recognizer: Arc<R>, image: impl Into<PathBuf>) -> Result<RecognitionJob>
where
    R: TextRecognizer + ?Sized + 'static,
{
    let image = image.into();
    debug!(image = %image.display(), "starting recognition");
    let handle = thread::Builder::new()
        .name("spendscan-recognizer".into())
        .spawn(move || recognizer.recognize(&image))?;
    Ok(RecognitionJob { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<String>);

    impl TextRecognizer for Fixed {
        fn recognize(&self, _image: &Path) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct Panicking;

    impl TextRecognizer for Panicking {
        fn recognize(&self, _image: &Path) -> Result<Vec<String>> {
            panic!("model crashed");
        }
    }

    #[test]
    fn test_text_file_recognizer_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.txt");
        std::fs::write(&path, "12/04\nSupermercato Rossi\n-45,30\n").unwrap();
        let lines = TextFileRecognizer.recognize(&path).unwrap();
        assert_eq!(lines, vec!["12/04", "Supermercato Rossi", "-45,30"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TextFileRecognizer.recognize(Path::new("/nonexistent/shot.txt")).unwrap_err();
        assert!(matches!(err, SpendscanError::Io(_)));
    }

    #[test]
    fn test_lazy_recognizer_loads_once_across_threads() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let lazy = Arc::new(LazyRecognizer::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Fixed(vec!["Bar".into()]))
        }));
        assert!(!lazy.is_loaded());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                thread::spawn(move || lazy.recognize(Path::new("x.png")).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec!["Bar".to_string()]);
        }
        assert!(lazy.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let attempts = AtomicUsize::new(0);
        let lazy = LazyRecognizer::new(|| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SpendscanError::Recognition("model file missing".into()))
            } else {
                Ok(Fixed(vec![]))
            }
        });
        assert!(lazy.get().is_err());
        assert!(!lazy.is_loaded());
        assert!(lazy.get().is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_background_job_returns_all_lines() {
        let recognizer = Arc::new(Fixed(vec!["Bar".into(), "-2,50".into()]));
        let job = recognize_in_background(recognizer, "shot.png").unwrap();
        assert_eq!(job.wait().unwrap(), vec!["Bar", "-2,50"]);
    }

    #[test]
    fn test_background_panic_is_recognition_error() {
        let job = recognize_in_background(Arc::new(Panicking), "shot.png").unwrap();
        assert!(matches!(job.wait(), Err(SpendscanError::Recognition(_))));
    }
}
