//! Platform-reserved action and property names.
//!
//! These are fixed reference sets; modularization never rewrites a name
//! found in them.

use fxhash::FxHashSet;
use once_cell::sync::Lazy;

/// Returns true when `name` is a standard sequence action.
pub fn is_standard_action(name: &str) -> bool {
    STANDARD_ACTIONS.contains(name)
}

/// Returns true when `name` is a standard (platform-defined) property.
pub fn is_standard_property(name: &str) -> bool {
    STANDARD_PROPERTIES.contains(name)
}

static STANDARD_ACTIONS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    FxHashSet::from_iter([
        "AllocateRegistrySpace",
        "AppSearch",
        "BindImage",
        "CCPSearch",
        "CostFinalize",
        "CostInitialize",
        "CreateFolders",
        "CreateShortcuts",
        "DeleteServices",
        "DisableRollback",
        "DuplicateFiles",
        "ExecuteAction",
        "FileCost",
        "FindRelatedProducts",
        "ForceReboot",
        "InstallAdminPackage",
        "InstallExecute",
        "InstallExecuteAgain",
        "InstallFiles",
        "InstallFinalize",
        "InstallInitialize",
        "InstallODBC",
        "InstallServices",
        "InstallSFPCatalogFile",
        "InstallValidate",
        "IsolateComponents",
        "LaunchConditions",
        "MigrateFeatureStates",
        "MoveFiles",
        "MsiPublishAssemblies",
        "MsiUnpublishAssemblies",
        "PatchFiles",
        "ProcessComponents",
        "PublishComponents",
        "PublishFeatures",
        "PublishProduct",
        "RegisterClassInfo",
        "RegisterComPlus",
        "RegisterExtensionInfo",
        "RegisterFonts",
        "RegisterMIMEInfo",
        "RegisterProduct",
        "RegisterProgIdInfo",
        "RegisterTypeLibraries",
        "RegisterUser",
        "RemoveDuplicateFiles",
        "RemoveEnvironmentStrings",
        "RemoveExistingProducts",
        "RemoveFiles",
        "RemoveFolders",
        "RemoveIniValues",
        "RemoveODBC",
        "RemoveRegistryValues",
        "RemoveShortcuts",
        "ResolveSource",
        "RMCCPSearch",
        "ScheduleReboot",
        "SelfRegModules",
        "SelfUnregModules",
        "SetODBCFolders",
        "StartServices",
        "StopServices",
        "UnpublishComponents",
        "UnpublishFeatures",
        "UnregisterClassInfo",
        "UnregisterComPlus",
        "UnregisterExtensionInfo",
        "UnregisterFonts",
        "UnregisterMIMEInfo",
        "UnregisterProgIdInfo",
        "UnregisterTypeLibraries",
        "ValidateProductID",
        "WriteEnvironmentStrings",
        "WriteIniValues",
        "WriteRegistryValues",
    ])
});

static STANDARD_PROPERTIES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    FxHashSet::from_iter([
        "ACTION",
        "ADDDEFAULT",
        "ADDLOCAL",
        "ADDSOURCE",
        "AdminProperties",
        "AdminUser",
        "ALLUSERS",
        "Alpha",
        "ApplicationUsers",
        "ARPAUTHORIZEDCDFPREFIX",
        "ARPCOMMENTS",
        "ARPCONTACT",
        "ARPHELPLINK",
        "ARPHELPTELEPHONE",
        "ARPINSTALLLOCATION",
        "ARPNOMODIFY",
        "ARPNOREMOVE",
        "ARPNOREPAIR",
        "ARPPRODUCTICON",
        "ARPREADME",
        "ARPSIZE",
        "ARPSYSTEMCOMPONENT",
        "ARPURLINFOABOUT",
        "ARPURLUPDATEINFO",
        "AVAILABLEFREEREG",
        "BorderSide",
        "BorderTop",
        "CaptionHeight",
        "CCP_DRIVE",
        "ColorBits",
        "COMPADDDEFAULT",
        "COMPADDLOCAL",
        "COMPADDSOURCE",
        "COMPANYNAME",
        "ComputerName",
        "CostingComplete",
        "Date",
        "DefaultUIFont",
        "DISABLEMEDIA",
        "DiskPrompt",
        "EXECUTEACTION",
        "EXECUTEMODE",
        "FASTOEM",
        "FileAddDefault",
        "FileAddLocal",
        "FileAddSource",
        "IncludeWholeFilesOnly",
        "Installed",
        "INSTALLLEVEL",
        "Intel",
        "Intel64",
        "IsAdminPackage",
        "LeftUnit",
        "LIMITUI",
        "LOGACTION",
        "LogonUser",
        "Manufacturer",
        "MEDIAPACKAGEPATH",
        "MediaSourceDir",
        "MinimumRequiredMsiVersion",
        "MsiAMD64",
        "MsiHiddenProperties",
        "MsiLogFileLocation",
        "MsiNTProductType",
        "MsiNTSuiteBackOffice",
        "MsiNTSuiteDataCenter",
        "MsiNTSuiteEnterprise",
        "MsiNTSuiteSmallBusiness",
        "MsiWin32AssemblySupport",
        "NOCOMPANYNAME",
        "NOUSERNAME",
        "OLEAdvtSupport",
        "OptimizePatchSizeForLargeFiles",
        "OriginalDatabase",
        "OutOfDiskSpace",
        "OutOfNoRbDiskSpace",
        "ParentOriginalDatabase",
        "ParentProductCode",
        "PATCH",
        "PATCH_CACHE_DIR",
        "PATCH_CACHE_ENABLED",
        "PhysicalMemory",
        "PIDKEY",
        "PIDTemplate",
        "Preselected",
        "PRIMARYFOLDER",
        "PrimaryVolumePath",
        "PrimaryVolumeSpaceAvailable",
        "PrimaryVolumeSpaceRemaining",
        "PrimaryVolumeSpaceRequired",
        "Privileged",
        "ProductCode",
        "ProductID",
        "ProductLanguage",
        "ProductName",
        "ProductState",
        "ProductVersion",
        "PROMPTROLLBACKCOST",
        "REBOOT",
        "REBOOTPROMPT",
        "RedirectedDllSupport",
        "REINSTALL",
        "REINSTALLMODE",
        "RemoveAdminTS",
        "REMOVE",
        "ReplacedInUseFiles",
        "RestrictedUserControl",
        "RESUME",
        "RollbackDisabled",
        "ROOTDRIVE",
        "ScreenX",
        "ScreenY",
        "SecureCustomProperties",
        "ServicePackLevel",
        "ServicePackLevelMinor",
        "SEQUENCE",
        "SharedWindows",
        "ShellAdvtSupport",
        "SHORTFILENAMES",
        "SourceDir",
        "SOURCELIST",
        "SystemLanguageID",
        "TARGETDIR",
        "TerminalServer",
        "TextHeight",
        "Time",
        "TRANSFORMS",
        "TRANSFORMSATSOURCE",
        "TRANSFORMSSECURE",
        "TTCSupport",
        "UILevel",
        "UpdateStarted",
        "UpgradeCode",
        "UPGRADINGPRODUCTCODE",
        "UserLanguageID",
        "USERNAME",
        "UserSID",
        "Version9X",
        "VersionDatabase",
        "VersionMsi",
        "VersionNT",
        "VersionNT64",
        "VirtualMemory",
        "WindowsBuild",
        "WindowsFolder",
        "WindowsVolume",
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_standard_names() {
        assert!(is_standard_action("CostFinalize"));
        assert!(is_standard_action("InstallFiles"));
        assert!(!is_standard_action("MyCustomAction"));

        assert!(is_standard_property("ProductCode"));
        assert!(is_standard_property("TARGETDIR"));
        assert!(!is_standard_property("MYPROPERTY"));
    }
}
