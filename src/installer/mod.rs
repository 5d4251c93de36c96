mod ledger;
mod manager;

pub use ledger::{
    InstalledPackage, LEDGER_FILENAME, LedgerFile, PackageLedger, validate_package_name,
};
pub use manager::{
    OutdatedPackage, PACKAGE_MANIFEST, PackageManager, PublishOptions, RegistryPackageManager,
    UpdatedPackage, read_package_manifest,
};
