use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use rcgen::{CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

/// The fixed SAN set every leaf certificate carries, regardless of what the
/// operator supplies (spec §4.8 step 2). Client libraries dial any of
/// `kubernetes`, `kubernetes.default`, `kubernetes.default.svc` depending on
/// convention, and `localhost`/`127.0.0.1` cover a host-exposed façade.
fn base_sans() -> Vec<String> {
    vec![
        "h2c-api".to_string(),
        "kubernetes".to_string(),
        "kubernetes.default".to_string(),
        "kubernetes.default.svc".to_string(),
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ]
}

pub struct CertBundle {
    pub ca_cert_pem: String,
    pub leaf_cert_pem: String,
    pub leaf_key_pem: String,
    pub sans: BTreeSet<String>,
}

fn issue_ca() -> anyhow::Result<(rcgen::Certificate, KeyPair)> {
    let key_pair = KeyPair::generate().context("generating CA key pair")?;
    let mut params = CertificateParams::new(Vec::<String>::new()).context("building CA params")?;
    params.is_ca = IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "h2c-ca");
    params.distinguished_name = dn;
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(2035, 1, 1);

    let cert = params
        .self_signed(&key_pair)
        .context("self-signing CA certificate")?;
    Ok((cert, key_pair))
}

fn issue_leaf(
    ca_cert: &rcgen::Certificate,
    ca_key: &KeyPair,
    sans: &BTreeSet<String>,
) -> anyhow::Result<(String, String)> {
    let san_strings: Vec<String> = sans.iter().cloned().collect();
    let mut params =
        CertificateParams::new(san_strings).context("building leaf certificate params")?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "h2c-api");
    params.distinguished_name = dn;
    params.is_ca = IsCa::NoCa;
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(2035, 1, 1);

    let leaf_key = KeyPair::generate().context("generating leaf key pair")?;
    let leaf_cert = params
        .signed_by(&leaf_key, ca_cert, ca_key)
        .context("signing leaf certificate with CA")?;

    Ok((leaf_cert.pem(), leaf_key.serialize_pem()))
}

/// Issues a fresh CA + leaf bundle for the given SAN set. Extra SANs beyond
/// `base_sans()` come from the operator's `--host` flags.
pub fn issue(extra_sans: &[String]) -> anyhow::Result<CertBundle> {
    let mut sans: BTreeSet<String> = base_sans().into_iter().collect();
    sans.extend(extra_sans.iter().cloned());

    let (ca_cert, ca_key) = issue_ca()?;
    let (leaf_cert_pem, leaf_key_pem) = issue_leaf(&ca_cert, &ca_key, &sans)?;

    Ok(CertBundle {
        ca_cert_pem: ca_cert.pem(),
        leaf_cert_pem,
        leaf_key_pem,
        sans,
    })
}

fn sans_manifest_path(dir: &Path) -> std::path::PathBuf {
    dir.join("sans.json")
}

fn read_existing_sans(dir: &Path) -> Option<BTreeSet<String>> {
    let raw = std::fs::read_to_string(sans_manifest_path(dir)).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Issues a new bundle unless one already exists at `dir` whose SAN set is a
/// superset of what's being requested now, in which case it's left alone
/// (spec §4.8 "Reuse semantics" — avoids gratuitous CA rotation on repeated
/// runs).
pub fn issue_or_reuse(dir: &Path, extra_sans: &[String]) -> anyhow::Result<bool> {
    let requested: BTreeSet<String> = base_sans()
        .into_iter()
        .chain(extra_sans.iter().cloned())
        .collect();

    let cert_path = dir.join("ca.crt");
    let leaf_path = dir.join("tls.crt");
    let key_path = dir.join("tls.key");

    if cert_path.is_file() && leaf_path.is_file() && key_path.is_file() {
        if let Some(existing) = read_existing_sans(dir) {
            if existing.is_superset(&requested) {
                return Ok(false);
            }
        }
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating SA bundle directory {}", dir.display()))?;

    let bundle = issue(extra_sans)?;
    std::fs::write(&cert_path, &bundle.ca_cert_pem)?;
    std::fs::write(&leaf_path, &bundle.leaf_cert_pem)?;
    std::fs::write(&key_path, &bundle.leaf_key_pem)?;
    std::fs::write(
        sans_manifest_path(dir),
        serde_json::to_string(&bundle.sans)?,
    )?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_bundle_includes_base_and_extra_sans() {
        let bundle = issue(&["kube.example".to_string()]).unwrap();
        assert!(bundle.sans.contains("kube.example"));
        assert!(bundle.sans.contains("localhost"));
        assert!(bundle.sans.contains("h2c-api"));
        assert!(bundle.leaf_cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(bundle.leaf_key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn reissue_skipped_when_existing_sans_are_superset() {
        let dir = tempfile::tempdir().unwrap();
        let wrote_first = issue_or_reuse(dir.path(), &["a.example".to_string(), "b.example".to_string()]).unwrap();
        assert!(wrote_first);

        let wrote_second = issue_or_reuse(dir.path(), &["a.example".to_string()]).unwrap();
        assert!(!wrote_second);
    }

    #[test]
    fn reissue_happens_when_new_sans_requested() {
        let dir = tempfile::tempdir().unwrap();
        issue_or_reuse(dir.path(), &["a.example".to_string()]).unwrap();
        let wrote_second = issue_or_reuse(dir.path(), &["c.example".to_string()]).unwrap();
        assert!(wrote_second);
    }
}
