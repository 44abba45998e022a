/// Helper macro to avoid retyping the base domain-like name of Harvester when creating further
/// string constants from it. When given no parameters, this returns the base domain-like name.
/// When given a string literal parameter it adds `/parameter` to the end.
macro_rules! harvester {
    () => {
        "harvesterhci.io"
    };
    ($s:literal) => {
        concat!(harvester!(), "/", $s)
    };
}

// API groups
pub const HARVESTER_GROUP: &str = harvester!();
pub const HARVESTER_API_VERSION: &str = harvester!("v1beta1");
pub const KUBEVIRT_GROUP: &str = "kubevirt.io";
pub const KUBEVIRT_API_VERSION: &str = "kubevirt.io/v1";

// Gateway prefix used by the simplified Harvester API.
pub const GATEWAY_PREFIX: &str = "v1/harvester";

pub const DEFAULT_NAMESPACE: &str = "default";

// Settings
pub const SETTING_SERVER_VERSION: &str = "server-version";
pub const SETTING_BACKUP_TARGET: &str = "backup-target";

// Annotation and label keys
pub const ANNOTATION_DESCRIPTION: &str = "field.cattle.io/description";
pub const ANNOTATION_IMAGE_ID: &str = harvester!("imageId");
pub const ANNOTATION_STORAGE_CLASS: &str = harvester!("storageClassName");
pub const ANNOTATION_SSH_NAMES: &str = harvester!("sshNames");
pub const ANNOTATION_VOLUME_CLAIM_TEMPLATES: &str = harvester!("volumeClaimTemplates");
pub const LABEL_CREATOR: &str = harvester!("creator");
pub const LABEL_VM_NAME: &str = harvester!("vmName");

// Cloud-init
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config";
pub const GUEST_AGENT_PACKAGE: &str = "qemu-guest-agent";
pub const CLOUD_INIT_DISK: &str = "cloudinitdisk";

#[test]
fn harvester_constants_macro_test() {
    assert_eq!("harvesterhci.io", harvester!());
    assert_eq!("harvesterhci.io/v1beta1", HARVESTER_API_VERSION);
    assert_eq!("harvesterhci.io/sshNames", ANNOTATION_SSH_NAMES);
}
