use std::fmt::{self, Display};

/// Build metadata captured by `build.rs` at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub build_target: &'static str,
    pub rust_version: &'static str,
    pub repo_version: &'static str,
    pub version: &'static str,
}

impl Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:    {} ({})", self.version, self.repo_version)?;
        writeln!(f, "profile:    {}", self.build_profile)?;
        writeln!(f, "features:   {}", self.build_features)?;
        writeln!(f, "target:     {}", self.build_target)?;
        writeln!(f, "rustc:      {}", self.rust_version)?;
        write!(f, "built at:   {}", self.build_timestamp)
    }
}

/// Build info captured when this workspace was compiled.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_target: env!("BUILD_TARGET"),
        rust_version: env!("RUST_VERSION"),
        repo_version: env!("REPO_VERSION"),
        version: env!("CARGO_PKG_VERSION"),
    }
}
