use super::{paths, SourceAdapter};
use crate::model::{BackingLocation, Field, IdentifierClass, LiveProperty, Locator, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// The computer name.
///
/// The pending name is authoritative and is mirrored into both TCP/IP hostname
/// values and, best effort, the live rename call. The active name only changes
/// after a reboot, so it is observed rather than written.
#[derive(Debug, Default)]
pub struct ComputerNameAdapter;

impl SourceAdapter for ComputerNameAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::ComputerName
    }

    fn fields(&self, _sources: &Sources) -> SourceResult<Vec<Field>> {
        Ok(vec![Field::new("ComputerName", "Computer Name", ValueFormat::HostName)
            .at(BackingLocation::target(Locator::store(
                paths::COMPUTER_NAME_PENDING,
                "ComputerName",
            )))
            .at(BackingLocation::mirror(Locator::store(paths::TCPIP_PARAMETERS, "Hostname")))
            .at(BackingLocation::mirror(Locator::store(paths::TCPIP_PARAMETERS, "NV Hostname")))
            .at(BackingLocation::mirror(Locator::Live(LiveProperty::Hostname)).best_effort())
            .at(BackingLocation::observer(Locator::store(
                paths::COMPUTER_NAME_ACTIVE,
                "ComputerName",
            )))])
    }
}
