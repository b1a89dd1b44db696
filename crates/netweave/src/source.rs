//! Loading sub-network drawings referenced by a super-network.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

use netweave_core::diagram::Diagram;
use netweave_parser::parse_document;

use crate::error::NetweaveError;

/// A parsed drawing together with the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Drawing {
    pub diagram: Diagram,
    pub source: String,
}

impl Drawing {
    /// Parse `source` into a drawing.
    ///
    /// # Errors
    ///
    /// Returns [`NetweaveError::Document`] if the text is not a valid diagram.
    pub fn parse(source: impl Into<String>) -> Result<Self, NetweaveError> {
        let source = source.into();
        match parse_document(&source) {
            Ok(diagram) => Ok(Self { diagram, source }),
            Err(err) => Err(NetweaveError::new_document_error(err, source)),
        }
    }
}

/// Resolves the `drawing` reference of a sub-network instance.
pub trait DrawingSource {
    /// Load the drawing named by `reference`.
    ///
    /// Returns `Ok(None)` when no such drawing exists.
    fn load(&self, reference: &str) -> Result<Option<Drawing>, NetweaveError>;
}

/// Loads drawings from files relative to a base directory, usually the
/// directory of the super-network file.
#[derive(Debug, Clone)]
pub struct FsDrawingSource {
    base_dir: PathBuf,
}

impl FsDrawingSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl DrawingSource for FsDrawingSource {
    fn load(&self, reference: &str) -> Result<Option<Drawing>, NetweaveError> {
        let path = self.base_dir.join(reference);
        debug!(path:? = path; "Loading sub-network drawing");
        match fs::read_to_string(&path) {
            Ok(text) => Drawing::parse(text).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Drawings held in memory, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct MemoryDrawingSource {
    drawings: HashMap<String, String>,
}

impl MemoryDrawingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drawing(mut self, reference: impl Into<String>, source: impl Into<String>) -> Self {
        self.drawings.insert(reference.into(), source.into());
        self
    }
}

impl DrawingSource for MemoryDrawingSource {
    fn load(&self, reference: &str) -> Result<Option<Drawing>, NetweaveError> {
        self.drawings
            .get(reference)
            .map(|source| Drawing::parse(source.as_str()))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWING: &str = r#"<mxGraphModel><root>
        <mxCell id="src-0"/>
        <mxCell id="src-1" parent="src-0"/>
    </root></mxGraphModel>"#;

    #[test]
    fn test_fs_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pump.drawio"), DRAWING).unwrap();

        let source = FsDrawingSource::new(dir.path());
        let drawing = source.load("pump.drawio").unwrap().unwrap();
        assert_eq!(drawing.source, DRAWING);
        assert!(source.load("missing.drawio").unwrap().is_none());
    }

    #[test]
    fn test_fs_source_reports_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.drawio"), "<mxGraphModel>").unwrap();

        let source = FsDrawingSource::new(dir.path());
        assert!(matches!(
            source.load("broken.drawio"),
            Err(NetweaveError::Document { .. })
        ));
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryDrawingSource::new().with_drawing("a.drawio", DRAWING);
        assert!(source.load("a.drawio").unwrap().is_some());
        assert!(source.load("b.drawio").unwrap().is_none());
    }
}
