// Layered RON configuration for the atlas builder and the asset server.
// Provides: data structures, layered loading, validation producing warnings (non-fatal), and tests.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs, io,
    net::{AddrParseError, SocketAddr},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Default location of the config file picked up by the binary when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "assets/config/atlas.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("parse RON {}: {source}", .path.display())]
    Parse { path: PathBuf, source: ron::error::SpannedError },

    #[error("invalid bind address {addr:?}: {source}")]
    BindAddr { addr: String, source: AddrParseError },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AtlasConfig {
    /// Texture file names, relative to `texture_dir`. Order decides the tile slot.
    pub textures: Vec<String>,
    pub texture_dir: PathBuf,
    /// Edge length in pixels of every tile (atlas width, and height per slot).
    pub tile_size: u32,
    pub output: PathBuf,
    /// JSON manifest written next to the PNG. `None` disables it.
    pub manifest: Option<PathBuf>,
}
impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            textures: vec![
                "dirt.png".into(),
                "cobblestone.png".into(),
                "planks_oak.png".into(),
            ],
            texture_dir: PathBuf::from("assets/textures"),
            tile_size: 32,
            output: PathBuf::from("assets/textures/atlas.png"),
            manifest: Some(PathBuf::from("assets/textures/atlas.json")),
        }
    }
}

impl AtlasConfig {
    pub fn texture_path(&self, name: &str) -> PathBuf {
        self.texture_dir.join(name)
    }
}

/// One static directory exposed under a URL prefix.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MountConfig {
    pub route: String,
    pub dir: PathBuf,
}

impl MountConfig {
    pub fn new(route: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self { route: route.into(), dir: dir.into() }
    }

    /// Route split into non-empty path segments (`"/static/img/"` -> `["static", "img"]`).
    pub fn segments(&self) -> Vec<String> {
        route_segments(&self.route)
    }
}

pub(crate) fn route_segments(route: &str) -> Vec<String> {
    route
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port`; a bare `:port` binds every interface.
    pub bind: String,
    pub mounts: Vec<MountConfig>,
    /// Path of the generated `<img>` snippet page.
    pub hotbar_route: String,
    /// Prepended to every texture name in the snippet's `src` attributes.
    pub hotbar_src_prefix: String,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            mounts: vec![
                MountConfig::new("/assets", "./assets"),
                MountConfig::new("/World", "./World"),
                MountConfig::new("/lib", "./lib"),
            ],
            hotbar_route: "textures.html".into(),
            hotbar_src_prefix: "../assets/textures/".into(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.bind.trim();
        let full = if raw.starts_with(':') {
            format!("0.0.0.0{raw}")
        } else {
            raw.to_owned()
        };
        full.parse().map_err(|source| ConfigError::BindAddr {
            addr: self.bind.clone(),
            source,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub atlas: AtlasConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, Option<ConfigError>) {
        match Self::load_from_file(&path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load multiple config layers, later files overriding earlier ones (deep merge of maps).
    /// Unreadable or unparseable layers are skipped; returns (config, layers_used, errors).
    pub fn load_layered<P, I>(paths: I) -> (Self, Vec<String>, Vec<String>)
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        use ron::value::Value;
        let mut merged: Option<Value> = None;
        let mut used = Vec::new();
        let mut errors = Vec::new();

        fn merge_value(base: &mut Value, overlay: Value) {
            match (base, overlay) {
                (Value::Map(bm), Value::Map(om)) => {
                    for (k, v) in om.into_iter() {
                        if bm.keys().any(|bk| *bk == k) {
                            merge_value(&mut bm[&k], v);
                        } else {
                            bm.insert(k, v);
                        }
                    }
                }
                (b, o) => *b = o,
            }
        }

        for p in paths {
            let path_ref = p.as_ref();
            match fs::read_to_string(path_ref) {
                Ok(txt) => match ron::from_str::<Value>(&txt) {
                    Ok(val) => {
                        match &mut merged {
                            Some(cur) => merge_value(cur, val),
                            None => merged = Some(val),
                        }
                        used.push(path_ref.display().to_string());
                    }
                    Err(e) => errors.push(format!("{}: parse error: {e}", path_ref.display())),
                },
                Err(e) => errors.push(format!("{}: read error: {e}", path_ref.display())),
            }
        }

        let Some(val) = merged else {
            return (AppConfig::default(), used, errors);
        };
        match val.into_rust::<AppConfig>() {
            Ok(cfg) => (cfg, used, errors),
            Err(e) => {
                errors.push(format!("failed to deserialize merged config; using defaults: {e}"));
                (AppConfig::default(), used, errors)
            }
        }
    }

    /// Validate the configuration returning a list of human-readable warning strings.
    /// These flag suspicious values; hard failures surface later from the build or the bind.
    pub fn validate(&self) -> Vec<String> {
        let mut w = Vec::new();
        let atlas = &self.atlas;
        if atlas.textures.is_empty() {
            w.push("atlas.textures is empty; atlas build will fail".into());
        }
        if atlas.tile_size == 0 {
            w.push("atlas.tile_size must be > 0".into());
        } else if atlas.tile_size > 1024 {
            w.push(format!(
                "atlas.tile_size {} very large; atlas height grows by this per texture",
                atlas.tile_size
            ));
        }
        let mut seen = HashSet::new();
        for name in &atlas.textures {
            if !seen.insert(name.as_str()) {
                w.push(format!("atlas.textures contains duplicate entry {name:?}"));
            }
            if name.contains('/') || name.contains('\\') {
                w.push(format!(
                    "atlas.textures entry {name:?} contains a path separator; hotbar src will not match texture_dir"
                ));
            }
        }
        let is_png = atlas
            .output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            w.push(format!(
                "atlas.output {} does not end in .png; the atlas is always PNG encoded",
                atlas.output.display()
            ));
        }

        let server = &self.server;
        if let Err(e) = server.socket_addr() {
            w.push(format!("server.bind: {e}"));
        }
        let hotbar = route_segments(&server.hotbar_route);
        if hotbar.is_empty() {
            w.push("server.hotbar_route is empty".into());
        }
        let mut routes = HashSet::new();
        for m in &server.mounts {
            let segs = m.segments();
            if segs.is_empty() {
                w.push(format!("server.mounts route {:?} is empty; mount ignored", m.route));
                continue;
            }
            if !routes.insert(segs.join("/")) {
                w.push(format!("server.mounts route {:?} mounted more than once", m.route));
            }
            if segs == hotbar {
                w.push(format!(
                    "server.mounts route {:?} shadows the hotbar route",
                    m.route
                ));
            }
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_historical_layout() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.atlas.textures,
            vec!["dirt.png", "cobblestone.png", "planks_oak.png"]
        );
        assert_eq!(cfg.atlas.tile_size, 32);
        assert_eq!(cfg.atlas.output, PathBuf::from("assets/textures/atlas.png"));
        assert_eq!(cfg.server.socket_addr().unwrap().port(), 8080);
        let routes: Vec<_> = cfg.server.mounts.iter().map(|m| m.route.as_str()).collect();
        assert_eq!(routes, ["/assets", "/World", "/lib"]);
        assert!(cfg.validate().is_empty(), "defaults warned: {:?}", cfg.validate());
    }

    #[test]
    fn parse_sample_config() {
        let sample = r#"(
            atlas: (
                textures: ["stone.png", "sand.png"],
                texture_dir: "res/tex",
                tile_size: 16,
                output: "out/atlas.png",
                manifest: None,
            ),
            server: (
                bind: "127.0.0.1:9000",
                mounts: [(route: "/static", dir: "./public")],
                hotbar_route: "hotbar.html",
            ),
        )"#;
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(sample.as_bytes()).unwrap();
        let cfg = AppConfig::load_from_file(file.path()).expect("parse config");
        assert_eq!(cfg.atlas.textures.len(), 2);
        assert_eq!(cfg.atlas.tile_size, 16);
        assert_eq!(cfg.atlas.texture_path("sand.png"), PathBuf::from("res/tex/sand.png"));
        assert!(cfg.atlas.manifest.is_none());
        assert_eq!(cfg.server.mounts, vec![MountConfig::new("/static", "./public")]);
        // untouched field keeps its default
        assert_eq!(cfg.server.hotbar_src_prefix, "../assets/textures/");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_or_default_missing_file() {
        let (cfg, err) = AppConfig::load_or_default("this/file/does/not/exist.ron");
        assert!(matches!(err, Some(ConfigError::Read { .. })));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn parse_error_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"(atlas: (tile_size: \"big\"))").unwrap();
        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err}");
    }

    #[test]
    fn layered_merge_overrides() {
        let base = r#"(
            atlas: (tile_size: 16, textures: ["a.png", "b.png"]),
            server: (bind: "127.0.0.1:3000"),
        )"#;
        let override_one = r#"(
            atlas: (tile_size: 64),
            server: (hotbar_route: "bar.html"),
        )"#;
        let mut f1 = tempfile::NamedTempFile::new().unwrap();
        let mut f2 = tempfile::NamedTempFile::new().unwrap();
        f1.write_all(base.as_bytes()).unwrap();
        f2.write_all(override_one.as_bytes()).unwrap();
        let (cfg, used, errors) = AppConfig::load_layered([f1.path(), f2.path()]);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(used.len(), 2);
        assert_eq!(cfg.atlas.textures, vec!["a.png", "b.png"]); // from base
        assert_eq!(cfg.atlas.tile_size, 64); // overridden
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.server.hotbar_route, "bar.html");
        assert_eq!(cfg.server.mounts, ServerConfig::default().mounts);
    }

    #[test]
    fn layered_skips_missing_layers() {
        let (cfg, used, errors) = AppConfig::load_layered(["nope/a.ron", "nope/b.ron"]);
        assert!(used.is_empty());
        assert_eq!(errors.len(), 2);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn layered_skips_unparseable_layer_and_keeps_the_rest() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        let mut broken = tempfile::NamedTempFile::new().unwrap();
        good.write_all(b"(atlas: (tile_size: 16))").unwrap();
        broken.write_all(b"(atlas: (tile_size: ").unwrap();
        let (cfg, used, errors) = AppConfig::load_layered([good.path(), broken.path()]);
        assert_eq!(used.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("parse error"), "{errors:?}");
        assert_eq!(cfg.atlas.tile_size, 16);
    }

    #[test]
    fn layered_bad_merged_value_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"(atlas: (tile_size: "big"))"#).unwrap();
        let (cfg, used, errors) = AppConfig::load_layered([file.path()]);
        assert_eq!(used.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("failed to deserialize merged config"), "{errors:?}");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn bare_port_binds_all_interfaces() {
        let server = ServerConfig { bind: ":8080".into(), ..Default::default() };
        let addr = server.socket_addr().unwrap();
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn validate_detects_warnings() {
        let bad = AppConfig {
            atlas: AtlasConfig {
                textures: vec!["dirt.png".into(), "dirt.png".into(), "sub/x.png".into()],
                tile_size: 0,
                output: PathBuf::from("atlas.bmp"),
                ..Default::default()
            },
            server: ServerConfig {
                bind: "not an address".into(),
                mounts: vec![
                    MountConfig::new("/", "./root"),
                    MountConfig::new("/assets", "./a"),
                    MountConfig::new("assets/", "./b"),
                    MountConfig::new("/textures.html", "./c"),
                ],
                ..Default::default()
            },
        };
        let warnings = bad.validate();
        let joined = warnings.join(" | ");
        assert!(joined.contains("tile_size must be > 0"));
        assert!(joined.contains("duplicate entry \"dirt.png\""));
        assert!(joined.contains("path separator"));
        assert!(joined.contains("does not end in .png"));
        assert!(joined.contains("server.bind"));
        assert!(joined.contains("is empty; mount ignored"));
        assert!(joined.contains("mounted more than once"));
        assert!(joined.contains("shadows the hotbar route"));
    }
}
