use super::{paths, SourceAdapter};
use crate::model::{BackingLocation, Field, IdentifierClass, Locator, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// The cryptography machine GUID.
#[derive(Debug, Default)]
pub struct MachineGuidAdapter;

impl SourceAdapter for MachineGuidAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::MachineGuid
    }

    fn fields(&self, _sources: &Sources) -> SourceResult<Vec<Field>> {
        Ok(vec![Field::new("MachineGuid", "Machine GUID", ValueFormat::Guid)
            .at(BackingLocation::target(Locator::store(paths::CRYPTOGRAPHY, "MachineGuid")))])
    }
}
