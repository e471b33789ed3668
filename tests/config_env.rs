use reccall::config::Config;
use serial_test::serial;
use std::{env, fs, time::Duration};

struct EnvGuard(Vec<(String, Option<String>)>);
impl EnvGuard {
    fn set_many(kvs: &[(&str, &str)]) -> Self {
        let mut saved = vec![];
        for (k, v) in kvs {
            let prev = env::var(k).ok();
            unsafe {
                env::set_var(k, v);
            }
            saved.push(((*k).to_string(), prev));
        }
        EnvGuard(saved)
    }
}
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, v) in self.0.drain(..) {
            match v {
                Some(val) => unsafe { env::set_var(k, val) },
                None => unsafe { env::remove_var(k) },
            }
        }
    }
}

fn set_home(dir: &str) -> EnvGuard {
    // Try to work across platforms
    EnvGuard::set_many(&[("HOME", dir), ("USERPROFILE", dir)])
}

#[test]
#[serial]
fn first_run_writes_default_settings() {
    let td = tempfile::tempdir().unwrap();
    let _home = set_home(td.path().to_str().unwrap());

    let cfg = Config::load_with_overrides(None).unwrap();
    assert!(cfg.settings_path.exists());
    assert_eq!(cfg.store_file(), td.path().join(".reccall.json"));
    assert_eq!(cfg.repo_config_file(), td.path().join(".reccall").join("repo-config.json"));
    assert!(cfg.settings.bootstrap_starter_pack);
    assert_eq!(cfg.http_timeout(), Duration::from_secs(30));
}

#[test]
#[serial]
fn env_overrides_apply() {
    let td = tempfile::tempdir().unwrap();
    let _home = set_home(td.path().to_str().unwrap());

    let _env = EnvGuard::set_many(&[
        ("RECCALL_STORE_FILE", "~/shortcuts.json"),
        ("RECCALL_STARTER_PACK_DIR", "/opt/reccall/pack"),
        ("RECCALL_BOOTSTRAP_STARTER_PACK", "false"),
        ("RECCALL_HTTP_TIMEOUT_SECS", "7"),
    ]);

    let cfg = Config::load_with_overrides(None).unwrap();
    assert_eq!(cfg.store_file(), td.path().join("shortcuts.json"));
    assert_eq!(cfg.starter_pack_dir(), Some(std::path::PathBuf::from("/opt/reccall/pack")));
    assert!(!cfg.settings.bootstrap_starter_pack);
    assert_eq!(cfg.http_timeout(), Duration::from_secs(7));
}

#[test]
#[serial]
fn cli_overrides_take_priority_and_persist() {
    let td = tempfile::tempdir().unwrap();
    let _home = set_home(td.path().to_str().unwrap());
    let _env = EnvGuard::set_many(&[("RECCALL_STORE_FILE", "/env/store.json")]);

    let cfg = Config::load_with_overrides(Some("/cli/store.json".into())).unwrap();
    assert_eq!(cfg.store_file(), std::path::PathBuf::from("/cli/store.json"));

    cfg.save().unwrap();
    let text = fs::read_to_string(&cfg.settings_path).unwrap();
    assert!(text.contains("/cli/store.json"));
}

#[test]
#[serial]
fn bad_env_values_are_rejected_and_bad_files_fall_back() {
    let td = tempfile::tempdir().unwrap();
    let _home = set_home(td.path().to_str().unwrap());
    fs::create_dir_all(td.path().join(".reccall")).unwrap();
    fs::write(td.path().join(".reccall").join("settings.toml"), "http_timeout_secs = \"soon\"").unwrap();

    let cfg = Config::load_with_overrides(None).unwrap();
    assert_eq!(cfg.settings.http_timeout_secs, 30);

    let _env = EnvGuard::set_many(&[("RECCALL_HTTP_TIMEOUT_SECS", "soon")]);
    assert!(Config::load_with_overrides(None).is_err());
}
