use std::path::Path;

use anyhow::Context;

/// The façade's service accounts are synthetic: every injected bundle
/// carries this exact literal rather than a signed JWT, since there is no
/// real API server to authenticate against (spec §4.8 step 3, GLOSSARY).
pub const FIXED_TOKEN: &str = "h2c-synthetic-service-account-token";

/// Writes the `token` and `namespace` members of the SA bundle. `ca.crt`,
/// `tls.crt`, `tls.key` are written separately by [`crate::cert::issue_or_reuse`]
/// into the same directory, giving the documented five-file bundle (spec §6).
pub fn write(dir: &Path, project_name: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating SA bundle directory {}", dir.display()))?;
    std::fs::write(dir.join("token"), FIXED_TOKEN)
        .with_context(|| format!("writing token file under {}", dir.display()))?;
    std::fs::write(dir.join("namespace"), project_name)
        .with_context(|| format!("writing namespace file under {}", dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_token_and_namespace_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "demo").unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("token")).unwrap(), FIXED_TOKEN);
        assert_eq!(std::fs::read_to_string(dir.path().join("namespace")).unwrap(), "demo");
    }
}
