use crate::error::LevelError;
use crate::schematic::Schematic;
use std::sync::OnceLock;

pub trait SchematicImporter: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, data: &[u8]) -> bool;
    fn read(&self, data: &[u8]) -> Result<Schematic, LevelError>;
}

/// Registry of schematic readers. Detection is content based, so a file's
/// extension never decides how it is parsed.
pub struct FormatManager {
    importers: Vec<Box<dyn SchematicImporter>>,
}

impl FormatManager {
    pub fn new() -> Self {
        Self {
            importers: Vec::new(),
        }
    }

    pub fn register_importer<I: SchematicImporter + 'static>(&mut self, importer: I) {
        self.importers.push(Box::new(importer));
    }

    pub fn detect_format(&self, data: &[u8]) -> Option<&'static str> {
        self.importers
            .iter()
            .find(|importer| importer.detect(data))
            .map(|importer| importer.name())
    }

    pub fn read(&self, data: &[u8]) -> Result<Schematic, LevelError> {
        for importer in &self.importers {
            if importer.detect(data) {
                return importer.read(data);
            }
        }
        Err(LevelError::UnsupportedFormat(
            "unknown or unsupported schematic format".to_string(),
        ))
    }

    pub fn list_importers(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.name()).collect()
    }
}

impl Default for FormatManager {
    fn default() -> Self {
        Self::new()
    }
}

static MANAGER: OnceLock<FormatManager> = OnceLock::new();

pub fn get_manager() -> &'static FormatManager {
    MANAGER.get_or_init(|| {
        let mut manager = FormatManager::new();
        // Sponge first: its root also carries Width/Height/Length.
        manager.register_importer(crate::formats::sponge::SpongeFormat);
        manager.register_importer(crate::formats::mcedit::McEditFormat);
        manager
    })
}
