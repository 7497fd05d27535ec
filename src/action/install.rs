//! `--install`: hand the matched specs to the npm CLI

use crate::version::types::Release;

#[cfg(windows)]
const NPM_PROGRAM: &str = "npm.cmd";
#[cfg(not(windows))]
const NPM_PROGRAM: &str = "npm";

/// `npm install name@version ...` for every release
pub fn install_command(releases: &[Release]) -> Vec<String> {
    [NPM_PROGRAM.to_string(), "install".to_string()]
        .into_iter()
        .chain(releases.iter().map(|release| release.spec.clone()))
        .collect()
}
