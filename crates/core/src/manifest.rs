//! Precache manifest and bucket naming.
//!
//! The manifest is compiled in. Changing it means shipping a new build with a
//! bumped cache version so activation retires the previous bucket.

/// URLs fetched and stored when the worker installs, in order.
///
/// Paths are root-relative and resolved against the configured origin. Non-ASCII
/// segments are percent-encoded on resolution.
pub const PRECACHE_URLS: &[&str] = &[
    "/",
    "/index.html",
    "/pwa/offline.html",
    "/pwa/manifest.json",
    "/assets/images/icons/icon.png",
    "/assets/images/backgrounds/bg.png",
    "/assets/images/backgrounds/bg1.png",
    "/assets/images/backgrounds/bg2.png",
    "/assets/images/backgrounds/bg3.png",
    "/assets/images/backgrounds/bg4.png",
    "/assets/images/backgrounds/bg5.png",
    "/pages/card-preview/CardPreview.html",
    "/pages/tools/BudgetChecker.html",
    "/pages/basic/sponsor.html",
    "/docs/license.html",
    "/pages/basic/blog.html",
    "/pages/basic/aboutme.html",
    "/pages/tools/hive.html",
    "/pages/tools/shitposter.html",
    "/pages/tools/dxprender.html",
    "/assets/fonts/SEGA_Humming.ttf",
    "/pages/card-preview/styles.3557e117b26a79f9.css",
    "/pages/card-preview/main.0547a4eebdd74823.js.下载",
    "/pages/card-preview/polyfills.c4724e5181d423aa.js.下载",
    "/pages/card-preview/runtime.a177a74581f89b3a.js.下载",
    "/pages/card-preview/scripts.da45db557e586536.js.下载",
];

const CACHE_INFIX: &str = "-cache-v";

/// Build a bucket name: `<app>-cache-v<version>`.
pub fn cache_name(app: &str, version: &str) -> String {
    format!("{app}{CACHE_INFIX}{version}")
}

/// Check for a dotted numeric version such as `1.0.0`.
///
/// A pre-release suffix after `-` is accepted (`4.0.0-202509`).
pub fn is_semver(version: &str) -> bool {
    let core = version.split_once('-').map_or(version, |(core, _)| core);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
