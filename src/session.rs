use std::fs;
use std::path::Path;
use std::rc::Rc;

use roxmltree::{Document as XmlDocument, ParsingOptions};
use tracing::trace;

use crate::error::{GpxError, Result};
use crate::options::GpxOptions;
use crate::schema::{SchemaCache, SchemaValidator};

/// Scoped access to the markup primitives: reading sources, parsing,
/// schema validation and writing serialized trees.
///
/// One session is acquired per operation chain and released when dropped,
/// so every exit path (including `?` on failure) tears it down.
pub struct MarkupSession {
    options: GpxOptions,
    schemas: SchemaCache,
}

impl MarkupSession {
    pub fn new(options: GpxOptions) -> Self {
        trace!("markup session acquired");
        let schemas = SchemaCache::new(options.schema_cache_size);
        Self { options, schemas }
    }

    pub fn options(&self) -> &GpxOptions {
        &self.options
    }

    /// Read a source file into memory.
    pub fn read_source(&self, path: &Path) -> Result<String> {
        if path.as_os_str().is_empty() {
            return Err(GpxError::Input("source path is empty".into()));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Parse markup text into a borrowed tree.
    pub fn parse<'a>(&self, text: &'a str) -> Result<XmlDocument<'a>> {
        let opts = ParsingOptions {
            nodes_limit: self.options.nodes_limit,
            ..ParsingOptions::default()
        };
        Ok(XmlDocument::parse_with_options(text, opts)?)
    }

    /// Load (or fetch from the session cache) the schema at `path`.
    pub fn schema(&mut self, path: &Path) -> Result<Rc<SchemaValidator>> {
        if path.as_os_str().is_empty() {
            return Err(GpxError::MissingSchema);
        }
        Ok(self.schemas.get_or_load(path)?)
    }

    /// Check serialized markup against the schema at `schema_path`.
    pub fn validate_against_schema(&mut self, xml: &str, schema_path: &Path) -> Result<()> {
        let validator = self.schema(schema_path)?;
        validator.validate(xml)?;
        Ok(())
    }

    /// Check an already parsed tree against the schema at `schema_path`.
    pub fn validate_tree(&mut self, tree: &XmlDocument, schema_path: &Path) -> Result<()> {
        let validator = self.schema(schema_path)?;
        validator.validate_tree(tree)?;
        Ok(())
    }

    /// Write serialized markup as UTF-8.
    pub fn write_tree(&self, xml: &str, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(GpxError::Input("destination path is empty".into()));
        }
        fs::write(path, xml)?;
        Ok(())
    }
}

impl Default for MarkupSession {
    fn default() -> Self {
        Self::new(GpxOptions::default())
    }
}

impl Drop for MarkupSession {
    fn drop(&mut self) {
        self.schemas.clear();
        trace!("markup session released");
    }
}
