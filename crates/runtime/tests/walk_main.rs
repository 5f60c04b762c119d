use std::process::Command;

#[test]
fn rollout_runs_with_default_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_walk_main"))
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to launch walk_main");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("walk environment ready"), "stdout: {stdout}");
    assert!(stdout.contains("rollout finished"));
    assert!(stdout.contains("evaluation metric"));
    assert!(stdout.contains("energy"));
}

#[test]
fn rollout_reads_config_file_and_reports_episodes() {
    let dir = std::env::temp_dir().join(format!("walk_main_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("walk.json");
    let config = serde_json::json!({
        "env": { "num_envs": 4, "episode_length_s": 0.2 },
        "commands": { "curriculum": true }
    });
    std::fs::write(&path, config.to_string()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_walk_main"))
        .arg(&path)
        .arg("30")
        .output()
        .expect("failed to launch walk_main");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rew_tracking_lin_vel"), "stdout: {stdout}");
    assert!(stdout.contains("max_command_x"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn bad_config_path_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_walk_main"))
        .arg("/nonexistent/walk.json")
        .output()
        .expect("failed to launch walk_main");
    assert!(!output.status.success());
}
