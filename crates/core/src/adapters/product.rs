use super::{paths, SourceAdapter};
use crate::model::{BackingLocation, Field, IdentifierClass, Locator, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// Windows product and installation identity.
#[derive(Debug, Default)]
pub struct ProductAdapter;

impl SourceAdapter for ProductAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::ProductId
    }

    fn fields(&self, _sources: &Sources) -> SourceResult<Vec<Field>> {
        let at = |name: &str| {
            BackingLocation::target(Locator::store(paths::WINDOWS_NT_CURRENT_VERSION, name))
        };
        let shown = |name: &str, label: &str| {
            Field::new(name, label, ValueFormat::Opaque).at(BackingLocation::observer(
                Locator::store(paths::WINDOWS_NT_CURRENT_VERSION, name),
            ))
        };
        Ok(vec![
            Field::new("ProductId", "Product ID", ValueFormat::ProductId).at(at("ProductId")),
            Field::new("BuildGUID", "Build GUID", ValueFormat::Guid).at(at("BuildGUID")),
            Field::new("InstallDate", "Install Date", ValueFormat::InstallDate)
                .at(at("InstallDate")),
            Field::new("DigitalProductId", "Digital Product ID", ValueFormat::HeaderBlob)
                .at(at("DigitalProductId"))
                .only_when_present(),
            Field::new("DigitalProductId4", "Digital Product ID 4", ValueFormat::HeaderBlob)
                .at(at("DigitalProductId4"))
                .only_when_present(),
            shown("BuildLab", "Build Lab"),
            shown("BuildLabEx", "Build Lab Ex"),
            shown("EditionID", "Edition ID"),
        ])
    }
}
