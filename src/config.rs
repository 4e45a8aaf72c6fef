use std::io::ErrorKind;
use std::path::PathBuf;
use std::{env, fs, io};

use serde::Deserialize;

pub const CFG_FILE_NAME: &str = "draftpad.toml";

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Paths {
    pub posts_dir: PathBuf,
    pub public_dir: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            posts_dir: PathBuf::from("posts"),
            public_dir: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Server {
    pub address: String,
    pub port: u16,
    pub auto_open: bool,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            address: "127.0.0.1".to_string(),
            port: 3030,
            auto_open: true,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug)]
pub enum LogLevel {
    Critical,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub paths: Paths,
    pub log: Option<Log>,
}

fn parse_path(path: PathBuf) -> PathBuf {
    if path.starts_with("${exe_dir}") {
        let cur_exe = env::current_exe().unwrap();
        let exe_dir = cur_exe.parent().unwrap().to_str().unwrap();
        let str_path = path.to_str().unwrap();
        PathBuf::from(str_path.replace("${exe_dir}", exe_dir))
    } else {
        path
    }
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => {
            return Err(io::Error::new(
                e.kind(),
                format!("Error opening configuration file {}: {}", cfg_path.display(), e),
            ))
        }
    };

    let mut cfg: Config = match toml::from_str::<Config>(cfg_content.as_str()) {
        Ok(cfg) => cfg,
        Err(e) => {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("Error parsing configuration file: {}", e),
            ))
        }
    };

    cfg.paths.posts_dir = parse_path(cfg.paths.posts_dir);
    cfg.paths.public_dir = cfg.paths.public_dir.map(parse_path);

    Ok(cfg)
}

/// Looks for the configuration file next to the executable, then in the
/// working directory, then in the user configuration directory.
pub fn find_config() -> Option<PathBuf> {
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            if exe_dir.join(CFG_FILE_NAME).exists() {
                return Some(exe_dir.join(CFG_FILE_NAME));
            }
        }
    }

    if let Ok(cur_dir) = env::current_dir() {
        if cur_dir.join(CFG_FILE_NAME).exists() {
            return Some(cur_dir.join(CFG_FILE_NAME));
        }
    }

    let cfg_dir = dirs::config_dir()?;
    if cfg_dir.join(CFG_FILE_NAME).exists() {
        return Some(cfg_dir.join(CFG_FILE_NAME));
    }

    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.address, "127.0.0.1");
        assert_eq!(cfg.server.port, 3030);
        assert!(cfg.server.auto_open);
        assert_eq!(cfg.paths.posts_dir, PathBuf::from("posts"));
        assert!(cfg.paths.public_dir.is_none());
        assert!(cfg.log.is_none());
    }

    #[test]
    fn test_read_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join(CFG_FILE_NAME);
        fs::write(
            &cfg_path,
            r#"
[server]
address = "0.0.0.0"
port = 8080
auto_open = false

[paths]
posts_dir = "/tmp/my-posts"

[log]
level = "Info"
log_to_console = true
"#,
        )
        .unwrap();

        let cfg = read_config(&cfg_path).unwrap();
        assert_eq!(cfg.server.address, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.server.auto_open);
        assert_eq!(cfg.paths.posts_dir, PathBuf::from("/tmp/my-posts"));
        assert!(cfg.log.is_some());
    }

    #[test]
    fn test_read_config_partial_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join(CFG_FILE_NAME);
        fs::write(&cfg_path, "[server]\nport = 9999\n").unwrap();

        let cfg = read_config(&cfg_path).unwrap();
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.server.address, "127.0.0.1");
        assert_eq!(cfg.paths.posts_dir, PathBuf::from("posts"));
    }

    #[test]
    fn test_read_config_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join(CFG_FILE_NAME);
        fs::write(&cfg_path, "[server\nport = oops").unwrap();

        let err = read_config(&cfg_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_config_missing_file() {
        let err = read_config(&PathBuf::from("/definitely/not/here.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
