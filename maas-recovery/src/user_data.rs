/// Mount point for the recovered data volume.
pub const DATA_MOUNT_POINT: &str = "/mnt/data";

/// Render the first-boot script for a replacement instance.
///
/// The script locates the attached non-root, non-boot block device, appends a
/// persistent fstab entry mounting it at [`DATA_MOUNT_POINT`], mounts it and
/// brings the supervisor back up. It exits non-zero when no data device is
/// attached. `payload` is an operator-supplied line handed through to the
/// instance.
pub fn build_recovery_user_data(payload: &str) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/bash -ex\n");
    script.push_str("exec > >(tee /var/log/user-data.log|logger -t user-data -s 2>/dev/console) 2>&1\n");
    script.push_str("\n");
    script.push_str("## setup the ebs volume for data.\n");
    script.push_str(
        "avail_blk=`lsblk -n -oNAME,MOUNTPOINT | grep -v '/$' | grep -v 'xvda' | awk -F' ' '{print $1}'`\n",
    );
    script.push_str("if [ -z \"$avail_blk\" ]; then\n");
    script.push_str("    echo \"Don't have a mounted data blk device.\"\n");
    script.push_str("    exit -1\n");
    script.push_str("fi\n");
    script.push_str("\n");
    script.push_str("cp /etc/fstab /etc/fstab.orig\n");
    script.push_str(&format!(
        "echo \"/dev/$avail_blk {} ext4 defaults,nofail,nobootwait 0 2\" >> /etc/fstab\n",
        DATA_MOUNT_POINT
    ));
    script.push_str("mount -a\n");
    script.push_str(&format!("echo \"{}\" >> /dev/null\n", payload));
    script.push_str("sudo service supervisor start\n");
    script.push_str("supervisorctl start all\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_mounts_the_data_volume_persistently() {
        let script = build_recovery_user_data("marker");
        assert!(script.starts_with("#!/bin/bash -ex\n"));
        assert!(script.contains("/dev/$avail_blk /mnt/data ext4 defaults,nofail,nobootwait 0 2"));
        assert!(script.contains(">> /etc/fstab"));
        assert!(script.contains("mount -a"));
    }

    #[test]
    fn script_fails_loudly_without_a_data_device() {
        let script = build_recovery_user_data("marker");
        assert!(script.contains("if [ -z \"$avail_blk\" ]; then"));
        assert!(script.contains("exit -1"));
    }

    #[test]
    fn script_starts_the_supervisor_and_embeds_the_payload() {
        let script = build_recovery_user_data("here is some data");
        assert!(script.contains("service supervisor start"));
        assert!(script.contains("supervisorctl start all"));
        assert!(script.contains("here is some data"));
    }
}
