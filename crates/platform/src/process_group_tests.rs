#![cfg(unix)]

use crate::unix::UnixPlatform;
use crate::Platform;
use tokio::process::Command;

#[tokio::test]
async fn new_process_group_lets_kill_process_group_reach_the_whole_tree() {
    let platform = UnixPlatform::detect();
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("sleep 30 & wait");
    platform.new_process_group(&mut cmd).expect("configuring a new group should not fail");

    let mut child = cmd.spawn().expect("spawning sh should succeed in test environment");
    // Give the shell a moment to fork its sleep child before we try to kill
    // the whole group.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    platform.kill_process_group(&mut child).expect("killing the group should succeed");
    let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
        .await
        .expect("child should exit promptly once its process group is killed")
        .expect("waiting on the child should not itself error");
    assert!(!status.success());
}
