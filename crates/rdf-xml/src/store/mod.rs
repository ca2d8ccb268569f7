//! Loading and storing whole RDF/XML documents.
//!
//! [`ByteStore`] abstracts where documents live. [`FileStore`] keeps them as
//! files under a root directory and replaces a file only once its new
//! content is fully on disk. [`RdfDocumentStore`] adds parsing and writing
//! on top, holding a lock for each whole read or write.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::codec::{GeneratorOptions, RdfXmlGenerator, RdfXmlProcessor};
use crate::error::StoreError;
use crate::model::{Graph, ResourceId};
use crate::xml::{Document, WriteOptions};

// =============================================================================
// Byte stores
// =============================================================================

/// A source and sink of documents keyed by location.
pub trait ByteStore {
    fn read(&self, location: &str) -> Result<Vec<u8>, StoreError>;

    fn write(&self, location: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Documents stored as files below a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    keep_backup: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_backup: false,
        }
    }

    /// Keep the previous content of a replaced file as `<name>.bak`.
    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `location` below the root. Absolute locations and `..`
    /// components are rejected so a location never leaves the root.
    pub fn path(&self, location: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(location);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            && relative.components().any(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(StoreError::InvalidLocation {
                location: location.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(location: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        location: location.display().to_string(),
        source,
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

impl ByteStore for FileStore {
    fn read(&self, location: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path(location)?;
        fs::read(&path).map_err(io_error(&path))
    }

    fn write(&self, location: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path(location)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(io_error(parent))?;

        // A uniquely named temp file in the target directory; dropping it on
        // error removes it.
        let mut temp = NamedTempFile::new_in(parent).map_err(io_error(parent))?;
        temp.write_all(bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(io_error(temp.path()))?;

        if self.keep_backup && path.exists() {
            let backup = sibling(&path, ".bak");
            fs::copy(&path, &backup).map_err(io_error(&backup))?;
        }
        temp.persist(&path).map_err(|e| io_error(&path)(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
        Ok(())
    }
}

// =============================================================================
// Document store
// =============================================================================

/// Reads and writes graphs through a [`ByteStore`].
///
/// Every call holds one lock from the first read to the last write, so two
/// stores of the same location never interleave.
#[derive(Debug)]
pub struct RdfDocumentStore<S> {
    store: S,
    lock: Mutex<()>,
    write_options: WriteOptions,
}

impl<S: ByteStore> RdfDocumentStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
            write_options: WriteOptions::default(),
        }
    }

    pub fn with_write_options(mut self, write_options: WriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Parses the document at `location` into a fresh graph.
    pub fn load(&self, location: &str, base: Option<&str>) -> Result<Graph, StoreError> {
        let mut graph = Graph::new();
        self.load_into(&mut graph, location, base)?;
        Ok(graph)
    }

    /// Parses the document at `location` into `graph`, returning its
    /// top-level resources.
    pub fn load_into(
        &self,
        graph: &mut Graph,
        location: &str,
        base: Option<&str>,
    ) -> Result<Vec<ResourceId>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let bytes = self.store.read(location)?;
        let document = Document::parse(&bytes)?;
        let roots = RdfXmlProcessor::new().process(graph, &document, base)?;
        info!(location, resources = graph.len(), "loaded document");
        Ok(roots)
    }

    /// Loads `location` and returns the first resource typed `type_uri`.
    pub fn load_resource(
        &self,
        location: &str,
        base: Option<&str>,
        type_uri: &str,
    ) -> Result<(Graph, ResourceId), StoreError> {
        let graph = self.load(location, base)?;
        let found = graph
            .resource_ids()
            .find(|id| graph.has_type(*id, type_uri));
        match found {
            Some(id) => Ok((graph, id)),
            None => Err(StoreError::NotFound {
                location: location.to_string(),
                type_uri: type_uri.to_string(),
            }),
        }
    }

    /// Writes every resource of `graph` to `location`.
    pub fn store(
        &self,
        location: &str,
        graph: &Graph,
        options: &GeneratorOptions,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let document = RdfXmlGenerator::new(options.clone()).create_graph_document(graph)?;
        let bytes = document.to_bytes(&self.write_options)?;
        self.store.write(location, &bytes)?;
        info!(location, bytes = bytes.len(), "stored document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, Value};
    use tempfile::TempDir;

    const EX: &str = "http://example.org/";

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        let ann = graph.locate_typed_resource("http://x/1", EX, "Person");
        graph
            .add_property_uri(ann, &format!("{EX}name"), Literal::plain("Ann"))
            .unwrap();
        graph
    }

    #[test]
    fn test_store_and_load() {
        let dir = TempDir::new().unwrap();
        let store = RdfDocumentStore::new(FileStore::new(dir.path()));

        store
            .store("people/ann.rdf", &sample_graph(), &GeneratorOptions::new())
            .unwrap();
        assert!(dir.path().join("people/ann.rdf").exists());
        let entries = fs::read_dir(dir.path().join("people")).unwrap().count();
        assert_eq!(entries, 1);

        let (graph, ann) = store
            .load_resource("people/ann.rdf", None, &format!("{EX}Person"))
            .unwrap();
        assert_eq!(graph.uri(ann), Some("http://x/1"));
        assert_eq!(
            graph.first_value(ann, &format!("{EX}name")),
            Some(&Value::Literal(Literal::plain("Ann")))
        );
    }

    #[test]
    fn test_load_resource_not_found() {
        let dir = TempDir::new().unwrap();
        let store = RdfDocumentStore::new(FileStore::new(dir.path()));
        store
            .store("ann.rdf", &sample_graph(), &GeneratorOptions::new())
            .unwrap();

        let err = store
            .load_resource("ann.rdf", None, &format!("{EX}City"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = RdfDocumentStore::new(FileStore::new(dir.path()));
        assert!(matches!(
            store.load("absent.rdf", None),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_backup_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let files = FileStore::new(dir.path()).with_backup(true);
        files.write("doc.rdf", b"first").unwrap();
        files.write("doc.rdf", b"second").unwrap();

        assert_eq!(files.read("doc.rdf").unwrap(), b"second");
        assert_eq!(fs::read(dir.path().join("doc.rdf.bak")).unwrap(), b"first");
    }

    #[test]
    fn test_locations_stay_below_root() {
        let dir = TempDir::new().unwrap();
        let files = FileStore::new(dir.path().join("root"));
        for location in ["../escape.rdf", "a/../../escape.rdf", "/tmp/escape.rdf", "", "."] {
            assert!(
                matches!(
                    files.write(location, b"x"),
                    Err(StoreError::InvalidLocation { .. })
                ),
                "{location}"
            );
        }
        assert!(!dir.path().join("escape.rdf").exists());
        assert_eq!(
            files.path("./a/b.rdf").unwrap(),
            dir.path().join("root").join("a/b.rdf")
        );
    }

    #[test]
    fn test_concurrent_writers_do_not_share_temp_files() {
        let dir = TempDir::new().unwrap();
        let first = FileStore::new(dir.path());
        let second = FileStore::new(dir.path());

        std::thread::scope(|scope| {
            for (store, byte) in [(&first, b'a'), (&second, b'b')] {
                scope.spawn(move || {
                    for _ in 0..20 {
                        store.write("doc.rdf", &[byte; 256]).unwrap();
                    }
                });
            }
        });

        let content = first.read("doc.rdf").unwrap();
        assert_eq!(content.len(), 256);
        assert!(content.iter().all(|b| *b == content[0]));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_malformed_document_is_xml_error() {
        let dir = TempDir::new().unwrap();
        let files = FileStore::new(dir.path());
        files.write("bad.rdf", b"<rdf:RDF").unwrap();
        let store = RdfDocumentStore::new(files);
        assert!(matches!(
            store.load("bad.rdf", None),
            Err(StoreError::Xml(_))
        ));
    }
}
