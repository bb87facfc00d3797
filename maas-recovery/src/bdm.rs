use crate::error::RecoveryError;
use maas_providers::{
    BlockDeviceMapping, BlockDeviceSpec, DATA_DEVICE, RATE_PROVISIONED_TYPE, ROOT_DEVICE,
};

/// Build the root + data block-device pair for a replacement instance.
///
/// `size` is the declared size with a trailing unit character ("20G" -> 20).
/// The root entry carries no overrides; the data entry is never marked
/// delete-on-termination - it holds the recovered data and must survive the
/// instance. `rate` only applies to the rate-provisioned volume type.
pub fn build_device_mapping(
    size: &str,
    volume_type: &str,
    rate: i32,
    snapshot_id: Option<&str>,
) -> Result<BlockDeviceMapping, RecoveryError> {
    let size_gb = parse_size_gb(size)?;

    let mut data = BlockDeviceSpec {
        size_gb: Some(size_gb),
        volume_type: Some(volume_type.to_string()),
        delete_on_termination: Some(false),
        ..Default::default()
    };
    if volume_type == RATE_PROVISIONED_TYPE {
        data.iops = Some(rate);
    }
    if let Some(snapshot) = snapshot_id.filter(|s| !s.is_empty()) {
        data.snapshot_id = Some(snapshot.to_string());
    }

    let mut mapping = BlockDeviceMapping::new();
    mapping.insert(ROOT_DEVICE.to_string(), BlockDeviceSpec::default());
    mapping.insert(DATA_DEVICE.to_string(), data);
    Ok(mapping)
}

fn parse_size_gb(size: &str) -> Result<i32, RecoveryError> {
    let mut chars = size.trim().chars();
    chars.next_back(); // strip the trailing unit character
    chars
        .as_str()
        .parse::<i32>()
        .map_err(|_| RecoveryError::MalformedSize(size.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_with_trailing_unit() {
        let mapping = build_device_mapping("20G", "gp2", 0, None).unwrap();
        assert_eq!(mapping[DATA_DEVICE].size_gb, Some(20));

        let mapping = build_device_mapping("500M", "gp2", 0, None).unwrap();
        assert_eq!(mapping[DATA_DEVICE].size_gb, Some(500));
    }

    #[test]
    fn data_volume_is_never_deleted_on_termination() {
        for volume_type in ["gp2", "io1", "standard"] {
            let mapping = build_device_mapping("20G", volume_type, 900, None).unwrap();
            assert_eq!(mapping[DATA_DEVICE].delete_on_termination, Some(false));
        }
    }

    #[test]
    fn rate_only_applies_to_rate_provisioned_type() {
        let mapping = build_device_mapping("20G", "io1", 900, None).unwrap();
        assert_eq!(mapping[DATA_DEVICE].iops, Some(900));

        let mapping = build_device_mapping("20G", "gp2", 900, None).unwrap();
        assert_eq!(mapping[DATA_DEVICE].iops, None);
    }

    #[test]
    fn snapshot_id_present_iff_supplied() {
        let mapping = build_device_mapping("20G", "gp2", 0, Some("snap-123")).unwrap();
        assert_eq!(mapping[DATA_DEVICE].snapshot_id.as_deref(), Some("snap-123"));

        let mapping = build_device_mapping("20G", "gp2", 0, None).unwrap();
        assert_eq!(mapping[DATA_DEVICE].snapshot_id, None);

        // Empty snapshot ids behave like no snapshot at all.
        let mapping = build_device_mapping("20G", "gp2", 0, Some("")).unwrap();
        assert_eq!(mapping[DATA_DEVICE].snapshot_id, None);
    }

    #[test]
    fn maps_exactly_the_two_fixed_devices() {
        let mapping = build_device_mapping("20G", "io1", 600, Some("snap-123")).unwrap();
        assert_eq!(mapping.len(), 2);
        assert!(mapping.contains_key(ROOT_DEVICE));
        assert!(mapping.contains_key(DATA_DEVICE));

        // Root keeps the provider defaults.
        assert_eq!(mapping[ROOT_DEVICE], BlockDeviceSpec::default());
    }

    #[test]
    fn rejects_malformed_sizes() {
        for bad in ["", "G", "twentyG", "2 0G"] {
            let err = build_device_mapping(bad, "gp2", 0, None).unwrap_err();
            assert!(matches!(err, RecoveryError::MalformedSize(_)), "{bad:?}");
        }
    }
}
