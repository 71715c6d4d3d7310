use std::fmt;
use std::str::FromStr;

/// Build target a release artifact is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformTag {
    Mac,
    Win,
    WinInstaller,
    Linux,
    LinuxAppImage,
}

impl PlatformTag {
    pub const ALL: [PlatformTag; 5] = [
        PlatformTag::Mac,
        PlatformTag::Win,
        PlatformTag::WinInstaller,
        PlatformTag::Linux,
        PlatformTag::LinuxAppImage,
    ];

    /// Determine the tag of the running build.
    ///
    /// Returns `None` on targets no release is published for.
    pub fn detect() -> Option<Self> {
        Self::detect_with(|name| std::env::var_os(name).is_some_and(|v| !v.is_empty()))
    }

    #[allow(unreachable_code, unused_variables)]
    fn detect_with(env_set: impl Fn(&str) -> bool) -> Option<Self> {
        #[cfg(target_os = "macos")]
        return Some(Self::Mac);

        #[cfg(all(target_os = "windows", feature = "installer"))]
        return Some(Self::WinInstaller);

        #[cfg(target_os = "windows")]
        return Some(Self::Win);

        #[cfg(target_os = "linux")]
        return Some(if env_set("APPIMAGE") {
            Self::LinuxAppImage
        } else {
            Self::Linux
        });

        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Win => "win",
            Self::WinInstaller => "win-installer",
            Self::Linux => "linux",
            Self::LinuxAppImage => "linux-appimage",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform tag '{0}'")]
pub struct UnknownPlatform(pub String);

impl FromStr for PlatformTag {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_owned()))
    }
}

/// Name of the release archive for `version` on `platform`.
pub fn binary_filename(version: &str, platform: PlatformTag) -> String {
    format!("feather-{}-{}.zip", version, platform)
}
